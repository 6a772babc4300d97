mod applications;
mod cache;
mod config;
mod confirm;
mod db;
mod error;
mod followups;
mod migrations;
mod models;
mod stages;
mod status;
mod store;
mod summary;
#[cfg(test)]
mod testing;
mod tui;
mod wizard;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use applications::ApplicationManager;
use cache::ReadCache;
use config::Config;
use confirm::{AssumeYes, Confirm, Deletion, Prompt};
use db::Database;
use followups::FollowupManager;
use models::{
    ApplicationFilter, ApplicationPatch, DocumentKind, Identity, NewApplication, NewDocument,
    NewStage, StagePatch,
};
use stages::StageManager;
use status::{label_for_code, ApplicationStatus, StageOutcome};
use store::Store;
use summary::Summary;
use wizard::{Materials, Wizard};

#[derive(Parser)]
#[command(name = "apptrack")]
#[command(about = "Track job applications, interview stages, and follow-ups")]
struct Cli {
    /// Identity to act as (defaults to APPTRACK_USER or USER)
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Path to the database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Add an application
    Add {
        /// Company name
        company: String,

        /// Job title
        title: String,

        /// Link to the posting (http or https)
        #[arg(long)]
        url: Option<String>,

        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Resume ID to attach
        #[arg(long)]
        resume: Option<i64>,

        /// Cover letter ID to attach
        #[arg(long)]
        cover_letter: Option<i64>,

        /// Mark as applied right away
        #[arg(long)]
        applied: bool,
    },

    /// Step through adding an application interactively
    New {
        /// Company name
        company: String,

        /// Job title
        title: String,
    },

    /// List applications
    List {
        /// Filter by status (saved, applied, interview, offer, rejected)
        #[arg(short, long)]
        status: Option<ApplicationStatus>,
    },

    /// Show application details
    Show {
        /// Application ID
        id: i64,
    },

    /// Edit an application
    Update {
        /// Application ID
        id: i64,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        title: Option<String>,

        /// New URL; an empty value clears it
        #[arg(long)]
        url: Option<String>,

        /// New notes; an empty value clears them
        #[arg(short, long)]
        notes: Option<String>,

        /// Resume ID; 0 detaches
        #[arg(long)]
        resume: Option<i64>,

        /// Cover letter ID; 0 detaches
        #[arg(long)]
        cover_letter: Option<i64>,
    },

    /// Set an application's status
    Status {
        /// Application ID
        id: i64,

        /// New status (saved, applied, interview, offer, rejected)
        status: ApplicationStatus,
    },

    /// Delete an application with its stages and follow-ups
    Delete {
        /// Application ID
        id: i64,
    },

    /// Manage interview stages
    Stage {
        #[command(subcommand)]
        command: StageCommands,
    },

    /// Manage follow-up actions
    Followup {
        #[command(subcommand)]
        command: FollowupCommands,
    },

    /// Show scheduled interviews that are still ahead
    Upcoming,

    /// Show counts by status and open work
    Summary,

    /// Manage resumes
    Resume {
        #[command(subcommand)]
        command: DocumentCommands,
    },

    /// Manage cover letters
    CoverLetter {
        #[command(subcommand)]
        command: DocumentCommands,
    },

    /// Browse applications in an interactive terminal UI
    Browse {
        /// Filter by status
        #[arg(short, long)]
        status: Option<ApplicationStatus>,
    },
}

#[derive(Subcommand)]
enum StageCommands {
    /// Add an interview stage to an application
    Add {
        /// Application ID
        application_id: i64,

        /// Stage title, e.g. "Phone screen"
        title: String,

        /// When it happens (YYYY-MM-DD or "YYYY-MM-DD HH:MM", UTC)
        #[arg(long, value_parser = parse_when)]
        at: Option<DateTime<Utc>>,

        #[arg(short, long)]
        location: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List stages for an application
    List {
        /// Application ID
        application_id: i64,
    },

    /// Update a stage; pass an empty string to clear a field
    Update {
        /// Stage ID
        id: i64,

        #[arg(short, long)]
        title: Option<String>,

        /// When it happens (YYYY-MM-DD or "YYYY-MM-DD HH:MM", UTC)
        #[arg(long)]
        at: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Set a stage outcome (pending, scheduled, passed, failed)
    Outcome {
        /// Stage ID
        id: i64,

        outcome: StageOutcome,
    },

    /// Advance a stage to the next outcome
    Cycle {
        /// Stage ID
        id: i64,
    },

    /// Delete a stage
    Delete {
        /// Stage ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum FollowupCommands {
    /// Add a follow-up action to an application
    Add {
        /// Application ID
        application_id: i64,

        /// What needs doing
        description: String,

        /// Due date (YYYY-MM-DD or "YYYY-MM-DD HH:MM", UTC)
        #[arg(long, value_parser = parse_when)]
        due: Option<DateTime<Utc>>,
    },

    /// List follow-ups, for one application or all of them
    List {
        /// Application ID
        application_id: Option<i64>,
    },

    /// Toggle a follow-up between done and open
    Done {
        /// Follow-up ID
        id: i64,
    },

    /// Delete a follow-up
    Delete {
        /// Follow-up ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum DocumentCommands {
    /// Add a document from a file
    Add {
        /// Name for this document
        name: String,

        /// Path to the file
        file: PathBuf,

        /// Optional notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List documents
    List,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("apptrack={}", level)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn parse_when(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Ok(at.with_timezone(&Utc));
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M") {
        return Ok(Utc.from_utc_datetime(&at));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("expected YYYY-MM-DD or \"YYYY-MM-DD HH:MM\", got '{}'", s))?;
    date.and_hms_opt(0, 0, 0)
        .map(|at| Utc.from_utc_datetime(&at))
        .ok_or_else(|| anyhow!("invalid date '{}'", s))
}

/// Empty string clears, anything else sets.
fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| if v.trim().is_empty() { None } else { Some(v) })
}

/// Empty string clears the time, anything else must parse.
fn clearable_when(value: Option<String>) -> Result<Option<Option<DateTime<Utc>>>> {
    match clearable(value) {
        None => Ok(None),
        Some(None) => Ok(Some(None)),
        Some(Some(s)) => Ok(Some(Some(parse_when(&s)?))),
    }
}

/// Zero detaches, anything else attaches.
fn detachable(value: Option<i64>) -> Option<Option<i64>> {
    value.map(|id| if id == 0 { None } else { Some(id) })
}

/// Stdin is only locked once a prompt is actually needed.
fn confirmer(assume_yes: bool) -> Box<dyn Confirm> {
    if assume_yes {
        Box::new(AssumeYes)
    } else {
        Box::new(Prompt::new(io::stdin().lock(), io::stderr()))
    }
}

fn report_deletion(what: &str, deletion: Deletion) {
    match deletion {
        Deletion::Deleted => println!("Deleted {}.", what),
        Deletion::Declined => println!("Kept {}.", what),
    }
}

/// Documents are weak references; a dangling id is shown, not an error.
fn document_label<S: Store + ?Sized>(store: &S, who: Option<&Identity>, id: i64) -> Result<String> {
    let doc = match who {
        Some(who) => store.get_document(who, id)?,
        None => None,
    };
    Ok(match doc {
        Some(doc) => format!("{} (#{})", doc.name, doc.id),
        None => format!("#{} (missing)", id),
    })
}

fn print_documents<S: Store + ?Sized>(store: &S, who: Option<&Identity>, kind: DocumentKind) -> Result<()> {
    let docs = match who {
        Some(who) => store.documents(who, kind)?,
        None => Vec::new(),
    };
    if docs.is_empty() {
        println!("No documents found.");
    } else {
        println!("{:<6} {:<30} {:<20}", "ID", "NAME", "UPDATED");
        println!("{}", "-".repeat(58));
        for doc in docs {
            println!(
                "{:<6} {:<30} {:<20}",
                doc.id,
                truncate(&doc.name, 28),
                doc.updated_at.format("%Y-%m-%d %H:%M")
            );
        }
    }
    Ok(())
}

fn add_document<S: Store + ?Sized>(
    store: &S,
    who: Option<&Identity>,
    kind: DocumentKind,
    name: String,
    file: PathBuf,
    notes: Option<String>,
) -> Result<()> {
    let who = who.ok_or(error::Error::SignedOut)?;
    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read document file: {}", file.display()))?;
    let name = models::require_text("document name", &name)?;
    let id = store.create_document(
        who,
        &NewDocument {
            kind,
            name: name.clone(),
            content,
            notes: models::optional_text(notes),
        },
    )?;
    println!("Added {} '{}' (ID: {})", kind.as_str().replace('_', " "), name, id);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(&config.log_level);

    let who = match &cli.user {
        Some(user) => Identity::new(user),
        None => config.user.clone(),
    };
    let who = who.as_ref();

    let db_path = cli.db.clone().unwrap_or_else(|| config.db_path.clone());
    let db = Database::open(&db_path)?;
    let cache = ReadCache::load(&config.cache_path, config.cache_ttl());

    let apps = ApplicationManager::new(&db, who).with_cache(&cache);
    let stages = StageManager::new(&db, who);
    let followups = FollowupManager::new(&db, who);

    match cli.command {
        Commands::Init => {
            println!(
                "Database initialized at {} (schema v{})",
                db.path().display(),
                db.schema_version()?.unwrap_or_default()
            );
        }

        Commands::Add {
            company,
            title,
            url,
            notes,
            resume,
            cover_letter,
            applied,
        } => {
            let app = apps.create(NewApplication {
                company,
                job_title: title,
                url,
                notes,
                resume_id: resume,
                cover_letter_id: cover_letter,
                mark_applied: applied,
            })?;
            println!("Added application #{} ({})", app.id, app.status.label());
        }

        Commands::New { company, title } => {
            let who_id = who.ok_or(error::Error::SignedOut)?;
            let resumes = db.resumes(who_id)?;
            let cover_letters = db.cover_letters(who_id)?;
            let existing = apps.list(ApplicationFilter::default())?;
            let mut wizard = Wizard::new(&company, &title);
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut output = io::stdout();
            let created = wizard::run_interactive(
                &mut wizard,
                &apps,
                &Materials {
                    resumes: &resumes,
                    cover_letters: &cover_letters,
                },
                &existing,
                &mut input,
                &mut output,
            )?;
            output.flush()?;
            match created {
                Some(app) => println!("Added application #{} ({})", app.id, app.status.label()),
                None => println!("Nothing added."),
            }
        }

        Commands::List { status } => {
            let list = apps.list(ApplicationFilter { status })?;
            if list.is_empty() {
                println!("No applications found.");
            } else {
                let upcoming = stages.upcoming(Utc::now())?;
                println!(
                    "{:<6} {:<14} {:<30} {:<20} {:<12} {:<12}",
                    "ID", "STATUS", "TITLE", "COMPANY", "UPDATED", "NEXT"
                );
                println!("{}", "-".repeat(97));
                for app in list {
                    let next = upcoming
                        .next_for(app.id)
                        .and_then(|s| s.scheduled_at)
                        .map(|at| at.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<6} {:<14} {:<30} {:<20} {:<12} {:<12}",
                        app.id,
                        format!("{} {}", app.status.icon(), app.status.label()),
                        truncate(&app.job_title, 28),
                        truncate(&app.company, 18),
                        app.updated_at.format("%Y-%m-%d"),
                        next
                    );
                }
            }
        }

        Commands::Show { id } => match apps.find(id)? {
            Some(app) => {
                println!("Application #{}", app.id);
                println!("Title: {}", app.job_title);
                println!("Company: {}", app.company);
                println!("Status: {}", label_for_code(app.status.as_str()).0);
                if let Some(url) = &app.url {
                    println!("URL: {}", url);
                }
                if let Some(applied) = app.applied_at {
                    println!("Applied: {}", applied.format("%Y-%m-%d %H:%M"));
                }
                for (label, doc_id) in [("Resume", app.resume_id), ("Cover letter", app.cover_letter_id)] {
                    if let Some(doc_id) = doc_id {
                        println!("{}: {}", label, document_label(&db, who, doc_id)?);
                    }
                }
                println!("Created: {}", app.created_at.format("%Y-%m-%d %H:%M"));
                println!("Updated: {}", app.updated_at.format("%Y-%m-%d %H:%M"));
                if let Some(notes) = &app.notes {
                    println!("\n--- Notes ---\n{}", textwrap::fill(notes, 80));
                }

                let app_stages = stages.stages_for(app.id)?;
                if !app_stages.is_empty() {
                    println!("\nInterview stages ({}):", app_stages.len());
                    for stage in app_stages {
                        let when = stage
                            .scheduled_at
                            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_else(|| "unscheduled".to_string());
                        println!(
                            "  #{} {} {} - {} ({})",
                            stage.id,
                            stage.outcome.icon(),
                            stage.title,
                            when,
                            stage.outcome.label()
                        );
                    }
                }

                let app_followups = followups.followups_for(app.id)?;
                if !app_followups.is_empty() {
                    println!("\nFollow-ups ({}):", app_followups.len());
                    for f in app_followups {
                        let due = f
                            .due_date
                            .map(|d| format!(" (due {})", d.format("%Y-%m-%d")))
                            .unwrap_or_default();
                        let check = if f.completed { "x" } else { " " };
                        println!("  #{} [{}] {}{}", f.id, check, f.description, due);
                    }
                }
            }
            None => {
                println!("Application #{} not found.", id);
            }
        },

        Commands::Update {
            id,
            company,
            title,
            url,
            notes,
            resume,
            cover_letter,
        } => {
            let app = apps.update(
                id,
                ApplicationPatch {
                    company,
                    job_title: title,
                    status: None,
                    url: clearable(url),
                    notes: clearable(notes),
                    resume_id: detachable(resume),
                    cover_letter_id: detachable(cover_letter),
                },
            )?;
            println!("Updated application #{}", app.id);
        }

        Commands::Status { id, status } => {
            let app = apps.set_status(id, status)?;
            println!("Marked #{} as {}.", app.id, app.status.label());
        }

        Commands::Delete { id } => {
            let deletion = apps.delete(id, confirmer(cli.yes).as_mut())?;
            report_deletion(&format!("application #{}", id), deletion);
        }

        Commands::Stage { command } => match command {
            StageCommands::Add {
                application_id,
                title,
                at,
                location,
                notes,
            } => {
                let stage = stages.add_stage(
                    application_id,
                    NewStage {
                        title,
                        scheduled_at: at,
                        location,
                        notes,
                    },
                )?;
                println!("Added stage #{} to application #{}", stage.id, application_id);
            }

            StageCommands::List { application_id } => {
                let list = stages.stages_for(application_id)?;
                if list.is_empty() {
                    println!("No stages found for application #{}.", application_id);
                } else {
                    println!("{:<6} {:<12} {:<30} {:<18}", "ID", "OUTCOME", "TITLE", "WHEN");
                    println!("{}", "-".repeat(68));
                    for stage in list {
                        println!(
                            "{:<6} {:<12} {:<30} {:<18}",
                            stage.id,
                            stage.outcome.label(),
                            truncate(&stage.title, 28),
                            stage
                                .scheduled_at
                                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                                .unwrap_or_else(|| "-".to_string())
                        );
                    }
                }
            }

            StageCommands::Update {
                id,
                title,
                at,
                location,
                notes,
            } => {
                let stage = stages.update_stage(
                    id,
                    StagePatch {
                        title,
                        scheduled_at: clearable_when(at)?,
                        location: clearable(location),
                        notes: clearable(notes),
                        outcome: None,
                    },
                )?;
                println!("Updated stage #{}: {}", stage.id, stage.title);
            }

            StageCommands::Outcome { id, outcome } => {
                let stage = stages.set_outcome(id, outcome)?;
                println!("Stage #{} is now {}.", stage.id, stage.outcome.label());
            }

            StageCommands::Cycle { id } => {
                let stage = stages.cycle_outcome(id)?;
                println!("Stage #{} is now {}.", stage.id, stage.outcome.label());
            }

            StageCommands::Delete { id } => {
                let deletion = stages.delete_stage(id, confirmer(cli.yes).as_mut())?;
                report_deletion(&format!("stage #{}", id), deletion);
            }
        },

        Commands::Followup { command } => match command {
            FollowupCommands::Add {
                application_id,
                description,
                due,
            } => {
                let f = followups.add_followup(application_id, &description, due)?;
                println!("Added follow-up #{} to application #{}", f.id, application_id);
            }

            FollowupCommands::List { application_id } => {
                let list = match application_id {
                    Some(id) => followups.followups_for(id)?,
                    None => followups.all()?,
                };
                if list.is_empty() {
                    println!("No follow-ups found.");
                } else {
                    let now = Utc::now();
                    println!("{:<6} {:<6} {:<5} {:<40} {:<12}", "ID", "APP", "DONE", "WHAT", "DUE");
                    println!("{}", "-".repeat(72));
                    for f in list {
                        let due = match f.due_date {
                            Some(d) if !f.completed && d < now => {
                                format!("{} !", d.format("%Y-%m-%d"))
                            }
                            Some(d) => d.format("%Y-%m-%d").to_string(),
                            None => "-".to_string(),
                        };
                        println!(
                            "{:<6} {:<6} {:<5} {:<40} {:<12}",
                            f.id,
                            f.application_id,
                            if f.completed { "yes" } else { "no" },
                            truncate(&f.description, 38),
                            due
                        );
                    }
                }
            }

            FollowupCommands::Done { id } => {
                let f = followups.toggle_completed(id)?;
                let state = if f.completed { "done" } else { "open" };
                println!("Follow-up #{} is {}.", f.id, state);
            }

            FollowupCommands::Delete { id } => {
                let deletion = followups.delete_followup(id, confirmer(cli.yes).as_mut())?;
                report_deletion(&format!("follow-up #{}", id), deletion);
            }
        },

        Commands::Upcoming => {
            let upcoming = stages.upcoming(Utc::now())?;
            if upcoming.is_empty() {
                println!("No upcoming interviews.");
            } else {
                println!("{:<18} {:<6} {:<30} {:<20}", "WHEN", "APP", "STAGE", "COMPANY");
                println!("{}", "-".repeat(76));
                for stage in &upcoming {
                    let company = apps
                        .find(stage.application_id)?
                        .map(|a| a.company)
                        .unwrap_or_default();
                    println!(
                        "{:<18} {:<6} {:<30} {:<20}",
                        stage
                            .scheduled_at
                            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_default(),
                        stage.application_id,
                        truncate(&stage.title, 28),
                        truncate(&company, 18)
                    );
                }
            }
        }

        Commands::Summary => {
            let summary = Summary::collect(&db, who, Utc::now())?;
            println!("Applications: {}", summary.total);
            for status in ApplicationStatus::ALL {
                println!(
                    "  {} {:<14} {}",
                    status.icon(),
                    status.label(),
                    summary.by_status.get(status.as_str()).copied().unwrap_or(0)
                );
            }
            println!("Upcoming interviews: {}", summary.upcoming_interviews);
            println!(
                "Open follow-ups: {} ({} overdue)",
                summary.open_followups, summary.overdue_followups
            );
        }

        Commands::Resume { command } => match command {
            DocumentCommands::Add { name, file, notes } => {
                add_document(&db, who, DocumentKind::Resume, name, file, notes)?
            }
            DocumentCommands::List => print_documents(&db, who, DocumentKind::Resume)?,
        },

        Commands::CoverLetter { command } => match command {
            DocumentCommands::Add { name, file, notes } => {
                add_document(&db, who, DocumentKind::CoverLetter, name, file, notes)?
            }
            DocumentCommands::List => print_documents(&db, who, DocumentKind::CoverLetter)?,
        },

        Commands::Browse { status } => {
            tui::run_browse(&db, who, &cache, status)?;
        }
    }

    cache.save().context("Failed to write the read cache")?;
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_when_accepts_date_and_time() {
        let day = parse_when("2025-03-04").unwrap();
        assert_eq!((day.year(), day.month(), day.day(), day.hour()), (2025, 3, 4, 0));

        let at = parse_when("2025-03-04 14:30").unwrap();
        assert_eq!((at.hour(), at.minute()), (14, 30));

        assert!(parse_when("next tuesday").is_err());
    }

    #[test]
    fn test_clearable_and_detachable() {
        assert_eq!(clearable(None), None);
        assert_eq!(clearable(Some("  ".into())), Some(None));
        assert_eq!(clearable(Some("x".into())), Some(Some("x".into())));
        assert_eq!(detachable(Some(0)), Some(None));
        assert_eq!(detachable(Some(4)), Some(Some(4)));
    }

    #[test]
    fn test_clearable_when_parses_or_clears() {
        assert!(clearable_when(None).unwrap().is_none());
        assert_eq!(clearable_when(Some("".into())).unwrap(), Some(None));
        let at = clearable_when(Some("2025-03-04 14:30".into()))
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!((at.day(), at.hour(), at.minute()), (4, 14, 30));
        assert!(clearable_when(Some("next tuesday".into())).is_err());
    }

    #[test]
    fn test_stage_update_args_parse() {
        let cli = Cli::try_parse_from([
            "apptrack", "stage", "update", "3", "--title", "Onsite", "--at", "", "--location", "",
        ])
        .unwrap();
        let Commands::Stage {
            command:
                StageCommands::Update {
                    id,
                    title,
                    at,
                    location,
                    notes,
                },
        } = cli.command
        else {
            panic!("expected stage update");
        };
        assert_eq!(id, 3);
        assert_eq!(title.as_deref(), Some("Onsite"));
        assert_eq!(clearable_when(at).unwrap(), Some(None));
        assert_eq!(clearable(location), Some(None));
        assert_eq!(notes, None);
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Ingénieur logiciel", 10), "Ingénie...");
    }
}
