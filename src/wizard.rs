//! Four-step creation flow: job info, resume, cover letter, review.

use std::io::{BufRead, Write};
use tracing::debug;

use crate::applications::{validate_url, ApplicationManager};
use crate::error::{Error, Result};
use crate::models::{Application, Document, NewApplication};
use crate::store::Store;

const SIMILARITY_THRESHOLD: f64 = 0.92;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardStep {
    JobInfo = 1,
    ResumeChoice = 2,
    CoverLetterChoice = 3,
    Review = 4,
}

impl WizardStep {
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::JobInfo => "Job info",
            Self::ResumeChoice => "Resume",
            Self::CoverLetterChoice => "Cover letter",
            Self::Review => "Review",
        }
    }

    fn next(self) -> Self {
        match self {
            Self::JobInfo => Self::ResumeChoice,
            Self::ResumeChoice => Self::CoverLetterChoice,
            Self::CoverLetterChoice | Self::Review => Self::Review,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::JobInfo | Self::ResumeChoice => Self::JobInfo,
            Self::CoverLetterChoice => Self::ResumeChoice,
            Self::Review => Self::CoverLetterChoice,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Wizard {
    step: WizardStep,
    draft: NewApplication,
    open: bool,
    error: Option<String>,
}

impl Wizard {
    /// Company and title come pre-filled from the chosen listing and are not
    /// re-validated until `finish`.
    pub fn new(company: &str, job_title: &str) -> Self {
        Self {
            step: WizardStep::JobInfo,
            draft: NewApplication {
                company: company.to_string(),
                job_title: job_title.to_string(),
                ..NewApplication::default()
            },
            open: true,
            error: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Inline error from the last failed `finish`.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn draft(&self) -> &NewApplication {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut NewApplication {
        &mut self.draft
    }

    pub fn can_go_back(&self) -> bool {
        self.step != WizardStep::JobInfo
    }

    /// On the review step the forward action is `finish`, not `next`.
    pub fn can_go_next(&self) -> bool {
        self.step != WizardStep::Review
    }

    pub fn next(&mut self) -> WizardStep {
        self.step = self.step.next();
        self.step
    }

    pub fn back(&mut self) -> WizardStep {
        self.step = self.step.prev();
        self.step
    }

    pub fn select_resume(&mut self, id: Option<i64>) {
        self.draft.resume_id = id;
    }

    pub fn select_cover_letter(&mut self, id: Option<i64>) {
        self.draft.cover_letter_id = id;
    }

    /// Creates the application from the review step. On success the wizard
    /// closes; on failure it stays open on review with the error recorded and
    /// nothing persisted.
    pub fn finish<S: Store + ?Sized>(
        &mut self,
        apps: &ApplicationManager<'_, S>,
    ) -> Result<Application> {
        if self.step != WizardStep::Review {
            return Err(Error::validation("finish is only available on the review step"));
        }
        match apps.create(self.draft.clone()) {
            Ok(app) => {
                self.open = false;
                self.error = None;
                Ok(app)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Existing applications with a near-identical company and title.
    pub fn similar<'b>(&self, existing: &'b [Application]) -> Vec<&'b Application> {
        let company = self.draft.company.trim().to_lowercase();
        let title = self.draft.job_title.trim().to_lowercase();
        existing
            .iter()
            .filter(|app| {
                strsim::jaro_winkler(&company, &app.company.to_lowercase()) >= SIMILARITY_THRESHOLD
                    && strsim::jaro_winkler(&title, &app.job_title.to_lowercase())
                        >= SIMILARITY_THRESHOLD
            })
            .collect()
    }
}

/// Choices available to the document steps.
pub struct Materials<'m> {
    pub resumes: &'m [Document],
    pub cover_letters: &'m [Document],
}

enum Answer {
    Next,
    Back,
    Quit,
}

fn read_answer<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

enum Field {
    Keep,
    Clear,
    Set(String),
    Quit,
}

/// Prompts for an optional text field. With a value already set, Enter keeps
/// it and `-` clears it. `None` when input ends.
fn read_field<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
    current: Option<&str>,
) -> Result<Option<Field>> {
    match current {
        Some(value) => write!(
            output,
            "{} [{}] (Enter keeps, - clears, q quits): ",
            label, value
        )?,
        None => write!(output, "{} (Enter to skip, q to quit): ", label)?,
    }
    output.flush()?;
    let Some(answer) = read_answer(input)? else {
        return Ok(None);
    };
    Ok(Some(match answer.as_str() {
        "q" | "quit" => Field::Quit,
        "" => Field::Keep,
        "-" => Field::Clear,
        _ => Field::Set(answer),
    }))
}

fn navigation(answer: &str) -> Option<Answer> {
    match answer {
        "b" | "back" => Some(Answer::Back),
        "q" | "quit" => Some(Answer::Quit),
        "" => Some(Answer::Next),
        _ => None,
    }
}

/// Drives the wizard over a line-based terminal. Returns `None` when the user
/// quits or input ends before an application is created.
pub fn run_interactive<S, R, W>(
    wizard: &mut Wizard,
    apps: &ApplicationManager<'_, S>,
    materials: &Materials<'_>,
    existing: &[Application],
    input: &mut R,
    output: &mut W,
) -> Result<Option<Application>>
where
    S: Store + ?Sized,
    R: BufRead,
    W: Write,
{
    while wizard.is_open() {
        let step = wizard.step();
        writeln!(output, "\n[{}/4] {}", step.number(), step.title())?;
        debug!(step = step.number(), "wizard step");

        match step {
            WizardStep::JobInfo => {
                writeln!(
                    output,
                    "{} at {}",
                    wizard.draft().job_title,
                    wizard.draft().company
                )?;
                loop {
                    let current = wizard.draft().url.clone();
                    match read_field(input, output, "URL", current.as_deref())? {
                        None | Some(Field::Quit) => return Ok(None),
                        Some(Field::Keep) => {}
                        Some(Field::Clear) => wizard.draft_mut().url = None,
                        Some(Field::Set(url)) => wizard.draft_mut().url = Some(url),
                    }
                    match validate_url(wizard.draft().url.clone()) {
                        Ok(_) => break,
                        Err(e) => writeln!(output, "{}", e)?,
                    }
                }

                let current = wizard.draft().notes.clone();
                match read_field(input, output, "Notes", current.as_deref())? {
                    None | Some(Field::Quit) => return Ok(None),
                    Some(Field::Keep) => {}
                    Some(Field::Clear) => wizard.draft_mut().notes = None,
                    Some(Field::Set(notes)) => wizard.draft_mut().notes = Some(notes),
                }

                write!(output, "Mark as applied now? [y/N] ")?;
                output.flush()?;
                let Some(apply) = read_answer(input)? else {
                    return Ok(None);
                };
                wizard.draft_mut().mark_applied =
                    matches!(apply.to_lowercase().as_str(), "y" | "yes");
                wizard.next();
            }

            WizardStep::ResumeChoice | WizardStep::CoverLetterChoice => {
                let (docs, current) = if step == WizardStep::ResumeChoice {
                    (materials.resumes, wizard.draft().resume_id)
                } else {
                    (materials.cover_letters, wizard.draft().cover_letter_id)
                };
                writeln!(output, "  0. (none)")?;
                for (i, doc) in docs.iter().enumerate() {
                    let marker = if current == Some(doc.id) { "*" } else { " " };
                    writeln!(output, "{} {}. {}", marker, i + 1, doc.name)?;
                }
                let back = if wizard.can_go_back() { ", b back" } else { "" };
                write!(
                    output,
                    "Choose [0-{}], Enter to continue{}, q quit: ",
                    docs.len(),
                    back
                )?;
                output.flush()?;
                let Some(answer) = read_answer(input)? else {
                    return Ok(None);
                };

                match navigation(&answer) {
                    Some(Answer::Next) => {
                        wizard.next();
                    }
                    Some(Answer::Back) => {
                        wizard.back();
                    }
                    Some(Answer::Quit) => return Ok(None),
                    None => match answer.parse::<usize>() {
                        Ok(0) => {
                            select(wizard, step, None);
                            wizard.next();
                        }
                        Ok(n) if n <= docs.len() => {
                            select(wizard, step, Some(docs[n - 1].id));
                            wizard.next();
                        }
                        _ => writeln!(output, "Not a valid choice: {}", answer)?,
                    },
                }
            }

            WizardStep::Review => {
                write_review(wizard, materials, existing, output)?;
                write!(output, "Enter to create, b back, q quit: ")?;
                output.flush()?;
                let Some(answer) = read_answer(input)? else {
                    return Ok(None);
                };
                match navigation(&answer) {
                    Some(Answer::Next) => match wizard.finish(apps) {
                        Ok(app) => return Ok(Some(app)),
                        Err(e) => writeln!(output, "Could not create application: {}", e)?,
                    },
                    Some(Answer::Back) => {
                        wizard.back();
                    }
                    Some(Answer::Quit) => return Ok(None),
                    None => writeln!(output, "Not a valid choice: {}", answer)?,
                }
            }
        }
    }
    Ok(None)
}

fn select(wizard: &mut Wizard, step: WizardStep, id: Option<i64>) {
    if step == WizardStep::ResumeChoice {
        wizard.select_resume(id);
    } else {
        wizard.select_cover_letter(id);
    }
}

fn document_name(docs: &[Document], id: Option<i64>) -> String {
    match id {
        Some(id) => docs
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| format!("#{}", id)),
        None => "(none)".to_string(),
    }
}

fn write_review<W: Write>(
    wizard: &Wizard,
    materials: &Materials<'_>,
    existing: &[Application],
    output: &mut W,
) -> Result<()> {
    let draft = wizard.draft();
    writeln!(output, "Company:      {}", draft.company)?;
    writeln!(output, "Title:        {}", draft.job_title)?;
    if let Some(url) = &draft.url {
        writeln!(output, "URL:          {}", url)?;
    }
    if let Some(notes) = &draft.notes {
        writeln!(output, "Notes:        {}", notes)?;
    }
    writeln!(
        output,
        "Status:       {}",
        if draft.mark_applied { "applied" } else { "saved" }
    )?;
    writeln!(
        output,
        "Resume:       {}",
        document_name(materials.resumes, draft.resume_id)
    )?;
    writeln!(
        output,
        "Cover letter: {}",
        document_name(materials.cover_letters, draft.cover_letter_id)
    )?;
    for app in wizard.similar(existing) {
        writeln!(
            output,
            "Note: you already track #{} {} at {} ({})",
            app.id, app.job_title, app.company, app.status
        )?;
    }
    if let Some(err) = wizard.error() {
        writeln!(output, "Error: {}", err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{DocumentKind, Identity, NewDocument};
    use crate::testing::FlakyStore;
    use crate::models::ApplicationFilter;

    fn ada() -> Identity {
        Identity::new("ada").unwrap()
    }

    fn to_review(wizard: &mut Wizard) {
        while wizard.can_go_next() {
            wizard.next();
        }
    }

    #[test]
    fn test_navigation_bounds() {
        let mut wizard = Wizard::new("Acme", "Engineer");
        assert_eq!(wizard.step(), WizardStep::JobInfo);
        assert!(!wizard.can_go_back());
        assert_eq!(wizard.back(), WizardStep::JobInfo);

        assert_eq!(wizard.next(), WizardStep::ResumeChoice);
        assert_eq!(wizard.next(), WizardStep::CoverLetterChoice);
        assert_eq!(wizard.next(), WizardStep::Review);
        assert!(!wizard.can_go_next());
        assert_eq!(wizard.next(), WizardStep::Review);
        assert_eq!(wizard.back(), WizardStep::CoverLetterChoice);
    }

    #[test]
    fn test_finish_only_from_review() {
        let db = Database::open_in_memory().unwrap();
        let who = ada();
        let apps = ApplicationManager::new(&db, Some(&who));
        let mut wizard = Wizard::new("Acme", "Engineer");
        wizard.next();

        assert!(matches!(wizard.finish(&apps), Err(Error::Validation(_))));
        assert!(wizard.is_open());
        assert!(apps.list(ApplicationFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_finish_with_resume_and_no_cover_letter() {
        let db = Database::open_in_memory().unwrap();
        let who = ada();
        let apps = ApplicationManager::new(&db, Some(&who));
        let resume_id = db
            .create_document(
                &who,
                &NewDocument {
                    kind: DocumentKind::Resume,
                    name: "Backend".into(),
                    content: "# Ada".into(),
                    notes: None,
                },
            )
            .unwrap();

        let mut wizard = Wizard::new("Acme", "Engineer");
        wizard.next();
        wizard.select_resume(Some(resume_id));
        to_review(&mut wizard);

        let app = wizard.finish(&apps).unwrap();
        assert_eq!(app.resume_id, Some(resume_id));
        assert_eq!(app.cover_letter_id, None);
        assert!(!wizard.is_open());
        assert!(wizard.error().is_none());
    }

    #[test]
    fn test_failed_finish_stays_open_on_review() {
        let store = FlakyStore::new();
        let who = ada();
        let apps = ApplicationManager::new(&store, Some(&who));
        let mut wizard = Wizard::new("Acme", "Engineer");
        wizard.select_resume(Some(3));
        to_review(&mut wizard);

        store.go_offline();
        assert!(wizard.finish(&apps).is_err());
        assert!(wizard.is_open());
        assert_eq!(wizard.step(), WizardStep::Review);
        assert!(wizard.error().unwrap().contains("unavailable"));

        store.go_online();
        assert!(apps.list(ApplicationFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_similar_flags_near_duplicates() {
        let db = Database::open_in_memory().unwrap();
        let who = ada();
        let apps = ApplicationManager::new(&db, Some(&who));
        for (company, title) in [("Acme Inc", "Backend Engineer"), ("Globex", "SRE")] {
            apps.create(NewApplication {
                company: company.into(),
                job_title: title.into(),
                ..NewApplication::default()
            })
            .unwrap();
        }
        let existing = apps.list(ApplicationFilter::default()).unwrap();

        let wizard = Wizard::new("ACME Inc.", "Backend Engineer");
        let similar = wizard.similar(&existing);
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].company, "Acme Inc");

        assert!(Wizard::new("Initech", "SRE").similar(&existing).is_empty());
    }

    #[test]
    fn test_interactive_flow_creates_application() {
        let db = Database::open_in_memory().unwrap();
        let who = ada();
        let apps = ApplicationManager::new(&db, Some(&who));
        let resume_id = db
            .create_document(
                &who,
                &NewDocument {
                    kind: DocumentKind::Resume,
                    name: "Backend".into(),
                    content: "# Ada".into(),
                    notes: None,
                },
            )
            .unwrap();
        let resumes = db.resumes(&who).unwrap();
        let materials = Materials {
            resumes: &resumes,
            cover_letters: &[],
        };

        // url, notes, apply now, pick resume 1, skip cover letter, back, forward, create
        let script = "https://acme.com/jobs/7\nreferral\ny\n1\n\nb\n\n\n";
        let mut input = script.as_bytes();
        let mut output = Vec::new();
        let mut wizard = Wizard::new("Acme", "Engineer");

        let app = run_interactive(&mut wizard, &apps, &materials, &[], &mut input, &mut output)
            .unwrap()
            .unwrap();
        assert_eq!(app.url.as_deref(), Some("https://acme.com/jobs/7"));
        assert_eq!(app.notes.as_deref(), Some("referral"));
        assert_eq!(app.resume_id, Some(resume_id));
        assert_eq!(app.cover_letter_id, None);
        assert_eq!(app.status, crate::status::ApplicationStatus::Applied);

        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("[4/4] Review"));
        assert!(transcript.contains("Resume:       Backend"));
    }

    #[test]
    fn test_interactive_rejected_url_is_asked_again() {
        let db = Database::open_in_memory().unwrap();
        let who = ada();
        let apps = ApplicationManager::new(&db, Some(&who));
        let materials = Materials {
            resumes: &[],
            cover_letters: &[],
        };

        // bad url, then clear it, no notes, not applied, skip documents, create
        let mut input = "acme.com/jobs\n-\n\nn\n\n\n\n".as_bytes();
        let mut output = Vec::new();
        let mut wizard = Wizard::new("Acme", "Engineer");

        let app = run_interactive(&mut wizard, &apps, &materials, &[], &mut input, &mut output)
            .unwrap()
            .unwrap();
        assert_eq!(app.url, None);
        assert_eq!(apps.list(ApplicationFilter::default()).unwrap().len(), 1);

        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("URL [acme.com/jobs] (Enter keeps, - clears, q quits)"));
    }

    #[test]
    fn test_interactive_back_to_job_info_can_clear_fields() {
        let db = Database::open_in_memory().unwrap();
        let who = ada();
        let apps = ApplicationManager::new(&db, Some(&who));
        let materials = Materials {
            resumes: &[],
            cover_letters: &[],
        };

        // url, notes, applied, skip documents, back x3 to job info,
        // keep url, clear notes, not applied, skip documents, create
        let script = "https://acme.com/jobs/7\nreferral\ny\n\n\nb\nb\nb\n\n-\nn\n\n\n\n";
        let mut input = script.as_bytes();
        let mut output = Vec::new();
        let mut wizard = Wizard::new("Acme", "Engineer");

        let app = run_interactive(&mut wizard, &apps, &materials, &[], &mut input, &mut output)
            .unwrap()
            .unwrap();
        assert_eq!(app.url.as_deref(), Some("https://acme.com/jobs/7"));
        assert_eq!(app.notes, None);
        assert_eq!(app.status, crate::status::ApplicationStatus::Saved);
    }

    #[test]
    fn test_interactive_quit_creates_nothing() {
        let db = Database::open_in_memory().unwrap();
        let who = ada();
        let apps = ApplicationManager::new(&db, Some(&who));
        let materials = Materials {
            resumes: &[],
            cover_letters: &[],
        };
        let mut input = "\n\n\nq\n".as_bytes();
        let mut output = Vec::new();
        let mut wizard = Wizard::new("Acme", "Engineer");

        let result =
            run_interactive(&mut wizard, &apps, &materials, &[], &mut input, &mut output).unwrap();
        assert!(result.is_none());
        assert!(apps.list(ApplicationFilter::default()).unwrap().is_empty());
    }
}
