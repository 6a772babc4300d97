use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap},
};
use std::io::stdout;

use crate::applications::ApplicationManager;
use crate::cache::ReadCache;
use crate::confirm::{AssumeYes, Deletion};
use crate::followups::FollowupManager;
use crate::models::{Application, ApplicationFilter, Document, FollowupAction, Identity, InterviewStage};
use crate::stages::StageManager;
use crate::status::{ApplicationStatus, Tone};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Overview,
    Interviews,
    Followups,
    Materials,
}

impl Tab {
    const ALL: [Tab; 4] = [Tab::Overview, Tab::Interviews, Tab::Followups, Tab::Materials];

    fn title(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Interviews => "Interviews",
            Tab::Followups => "Follow-ups",
            Tab::Materials => "Materials",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingDelete {
    Application(i64),
    Stage(i64),
    Followup(i64),
}

struct AppState {
    apps: Vec<Application>,
    selected: usize,
    scroll_offset: u16,
    tab: Tab,
    stages: Vec<InterviewStage>,
    stage_selected: usize,
    followups: Vec<FollowupAction>,
    followup_selected: usize,
    documents: Vec<Document>,
    pending_delete: Option<PendingDelete>,
    message: Option<String>,
}

impl AppState {
    fn new(apps: Vec<Application>, documents: Vec<Document>) -> Self {
        Self {
            apps,
            selected: 0,
            scroll_offset: 0,
            tab: Tab::Overview,
            stages: Vec::new(),
            stage_selected: 0,
            followups: Vec::new(),
            followup_selected: 0,
            documents,
            pending_delete: None,
            message: None,
        }
    }

    /// Resumes and cover letters for the Materials tab. A failed lookup
    /// leaves the list short and says so in the status line.
    fn load_documents<S: Store + ?Sized>(&mut self, store: &S, who: &Identity) {
        self.documents.clear();
        for found in [store.resumes(who), store.cover_letters(who)] {
            match found {
                Ok(docs) => self.documents.extend(docs),
                Err(e) => self.message = Some(format!("Could not load documents: {}", e)),
            }
        }
    }

    fn current_app(&self) -> Option<&Application> {
        self.apps.get(self.selected)
    }

    fn load_details<S: Store + ?Sized>(&mut self, ctx: &Managers<'_, S>) {
        let Some(id) = self.current_app().map(|a| a.id) else {
            return;
        };
        match ctx.stages.stages_for(id) {
            Ok(stages) => self.stages = stages,
            Err(e) => {
                self.stages.clear();
                self.message = Some(format!("Could not load stages: {}", e));
            }
        }
        match ctx.followups.followups_for(id) {
            Ok(followups) => self.followups = followups,
            Err(e) => {
                self.followups.clear();
                self.message = Some(format!("Could not load follow-ups: {}", e));
            }
        }
        self.stage_selected = self.stage_selected.min(self.stages.len().saturating_sub(1));
        self.followup_selected = self
            .followup_selected
            .min(self.followups.len().saturating_sub(1));
    }

    fn next(&mut self) {
        if !self.apps.is_empty() && self.selected < self.apps.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    fn next_item(&mut self) {
        match self.tab {
            Tab::Interviews if self.stage_selected + 1 < self.stages.len() => {
                self.stage_selected += 1
            }
            Tab::Followups if self.followup_selected + 1 < self.followups.len() => {
                self.followup_selected += 1
            }
            _ => {}
        }
    }

    fn prev_item(&mut self) {
        match self.tab {
            Tab::Interviews => self.stage_selected = self.stage_selected.saturating_sub(1),
            Tab::Followups => self.followup_selected = self.followup_selected.saturating_sub(1),
            _ => {}
        }
    }

    fn document_name(&self, id: Option<i64>) -> String {
        match id {
            Some(id) => self
                .documents
                .iter()
                .find(|d| d.id == id)
                .map(|d| d.name.clone())
                .unwrap_or_else(|| format!("#{} (missing)", id)),
            None => "(none)".to_string(),
        }
    }
}

struct Managers<'a, S: Store + ?Sized> {
    apps: ApplicationManager<'a, S>,
    stages: StageManager<'a, S>,
    followups: FollowupManager<'a, S>,
}

pub fn run_browse<S: Store + ?Sized>(
    store: &S,
    who: Option<&Identity>,
    cache: &ReadCache,
    status: Option<ApplicationStatus>,
) -> Result<()> {
    let ctx = Managers {
        apps: ApplicationManager::new(store, who).with_cache(cache),
        stages: StageManager::new(store, who),
        followups: FollowupManager::new(store, who),
    };

    let apps = ctx.apps.list(ApplicationFilter { status })?;
    if apps.is_empty() {
        println!("No applications found.");
        return Ok(());
    }

    let mut state = AppState::new(apps, Vec::new());
    if let Some(who) = who {
        state.load_documents(store, who);
    }
    state.load_details(&ctx);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, &ctx);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop<S: Store + ?Sized>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    ctx: &Managers<'_, S>,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            if let Some(pending) = state.pending_delete.take() {
                resolve_delete(state, ctx, pending, key.code == KeyCode::Char('y'));
                list_state.select((!state.apps.is_empty()).then_some(state.selected));
                continue;
            }

            let prev_selected = state.selected;
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Tab => state.tab = state.tab.next(),
                KeyCode::BackTab => state.tab = state.tab.prev(),
                KeyCode::Char(']') => state.next_item(),
                KeyCode::Char('[') => state.prev_item(),
                KeyCode::Char('s') => set_status(state, ctx, ApplicationStatus::Saved),
                KeyCode::Char('a') => set_status(state, ctx, ApplicationStatus::Applied),
                KeyCode::Char('i') => set_status(state, ctx, ApplicationStatus::Interview),
                KeyCode::Char('o') => set_status(state, ctx, ApplicationStatus::Offer),
                KeyCode::Char('x') => set_status(state, ctx, ApplicationStatus::Rejected),
                KeyCode::Char('c') if state.tab == Tab::Interviews => cycle_outcome(state, ctx),
                KeyCode::Char(' ') if state.tab == Tab::Followups => toggle_followup(state, ctx),
                KeyCode::Char('d') => request_delete(state),
                _ => {}
            }
            if state.selected != prev_selected {
                list_state.select(Some(state.selected));
                state.stage_selected = 0;
                state.followup_selected = 0;
                state.load_details(ctx);
            }
        }
    }
    Ok(())
}

// Local state only changes from results the store has committed.

fn set_status<S: Store + ?Sized>(
    state: &mut AppState,
    ctx: &Managers<'_, S>,
    status: ApplicationStatus,
) {
    let Some(id) = state.current_app().map(|a| a.id) else {
        return;
    };
    match ctx.apps.set_status(id, status) {
        Ok(app) => {
            state.message = Some(format!("#{} marked {}", app.id, app.status.label()));
            state.apps[state.selected] = app;
        }
        Err(e) => state.message = Some(format!("Update failed: {}", e)),
    }
}

fn cycle_outcome<S: Store + ?Sized>(state: &mut AppState, ctx: &Managers<'_, S>) {
    let Some(id) = state.stages.get(state.stage_selected).map(|s| s.id) else {
        return;
    };
    match ctx.stages.cycle_outcome(id) {
        Ok(stage) => state.stages[state.stage_selected] = stage,
        Err(e) => state.message = Some(format!("Update failed: {}", e)),
    }
}

fn toggle_followup<S: Store + ?Sized>(state: &mut AppState, ctx: &Managers<'_, S>) {
    let Some(id) = state.followups.get(state.followup_selected).map(|f| f.id) else {
        return;
    };
    match ctx.followups.toggle_completed(id) {
        Ok(_) => state.load_details(ctx),
        Err(e) => state.message = Some(format!("Update failed: {}", e)),
    }
}

fn request_delete(state: &mut AppState) {
    let pending = match state.tab {
        Tab::Interviews => state
            .stages
            .get(state.stage_selected)
            .map(|s| (PendingDelete::Stage(s.id), s.title.clone())),
        Tab::Followups => state
            .followups
            .get(state.followup_selected)
            .map(|f| (PendingDelete::Followup(f.id), f.description.clone())),
        _ => state
            .current_app()
            .map(|a| (PendingDelete::Application(a.id), format!("{} at {}", a.job_title, a.company))),
    };
    if let Some((pending, label)) = pending {
        state.message = Some(format!("Delete '{}'? y to confirm, any other key cancels", label));
        state.pending_delete = Some(pending);
    }
}

fn resolve_delete<S: Store + ?Sized>(
    state: &mut AppState,
    ctx: &Managers<'_, S>,
    pending: PendingDelete,
    confirmed: bool,
) {
    if confirmed {
        confirm_delete(state, ctx, pending);
    } else {
        state.message = Some("Delete cancelled".to_string());
    }
}

fn confirm_delete<S: Store + ?Sized>(
    state: &mut AppState,
    ctx: &Managers<'_, S>,
    pending: PendingDelete,
) {
    // the user already answered the prompt in the status line
    let result = match pending {
        PendingDelete::Application(id) => ctx.apps.delete(id, &mut AssumeYes),
        PendingDelete::Stage(id) => ctx.stages.delete_stage(id, &mut AssumeYes),
        PendingDelete::Followup(id) => ctx.followups.delete_followup(id, &mut AssumeYes),
    };
    match result {
        Ok(Deletion::Deleted) => {
            state.message = Some("Deleted".to_string());
            if let PendingDelete::Application(id) = pending {
                state.apps.retain(|a| a.id != id);
                state.selected = state.selected.min(state.apps.len().saturating_sub(1));
                state.stages.clear();
                state.followups.clear();
            }
            state.load_details(ctx);
        }
        Ok(Deletion::Declined) => state.message = Some("Delete cancelled".to_string()),
        Err(e) => state.message = Some(format!("Delete failed: {}", e)),
    }
}

fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Neutral => Style::default(),
        Tone::Info => Style::default().fg(Color::Cyan),
        Tone::Progress => Style::default().fg(Color::Yellow),
        Tone::Success => Style::default().fg(Color::Green),
        Tone::Danger => Style::default().fg(Color::Red),
    }
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1), Constraint::Length(1)])
        .split(frame.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[0]);

    // Left panel: application list
    let items: Vec<ListItem> = state
        .apps
        .iter()
        .map(|app| {
            let title = if app.job_title.chars().count() > 30 {
                format!("{}...", app.job_title.chars().take(27).collect::<String>())
            } else {
                app.job_title.clone()
            };
            ListItem::new(format!(
                "{} #{:<4} {} | {}",
                app.status.icon(),
                app.id,
                title,
                app.company
            ))
            .style(tone_style(app.status.tone()))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Applications ({}) ", state.apps.len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: tabs over the detail
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(chunks[1]);

    let tabs = Tabs::new(Tab::ALL.iter().map(|t| t.title()).collect::<Vec<_>>())
        .block(Block::default().borders(Borders::ALL))
        .select(state.tab.index())
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan));
    frame.render_widget(tabs, right[0]);

    let detail = match state.tab {
        Tab::Overview => build_overview(state),
        Tab::Interviews => build_interviews(state),
        Tab::Followups => build_followups(state),
        Tab::Materials => build_materials(state),
    };
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(format!(" {} ", state.tab.title())))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail_widget, right[1]);

    // Status line
    if let Some(message) = &state.message {
        frame.render_widget(
            Paragraph::new(format!(" {}", message)).style(Style::default().fg(Color::Yellow)),
            rows[1],
        );
    }

    // Footer help
    let help = match state.tab {
        Tab::Interviews => " j/k:app  [/]:stage  c:cycle outcome  d:delete  Tab:tabs  q:quit",
        Tab::Followups => " j/k:app  [/]:item  space:done  d:delete  Tab:tabs  q:quit",
        _ => " j/k:navigate  J/K:scroll  s/a/i/o/x:status  d:delete  Tab:tabs  q:quit",
    };
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        rows[2],
    );
}

fn build_overview(state: &AppState) -> Text<'_> {
    let Some(app) = state.current_app() else {
        return Text::raw("No application selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    // Header
    lines.push(Line::from(Span::styled(
        app.job_title.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {}", app.company)));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", app.status.label()),
        tone_style(app.status.tone()),
    )));

    if let Some(url) = &app.url {
        lines.push(Line::from(format!("URL: {}", url)));
    }
    if let Some(applied) = app.applied_at {
        lines.push(Line::from(format!("Applied: {}", applied.format("%Y-%m-%d"))));
    }
    lines.push(Line::from(format!(
        "Created: {}   Updated: {}",
        app.created_at.format("%Y-%m-%d %H:%M"),
        app.updated_at.format("%Y-%m-%d %H:%M")
    )));
    lines.push(Line::from(""));

    let open_stages = state.stages.iter().filter(|s| s.outcome.is_open()).count();
    let open_followups = state.followups.iter().filter(|f| !f.completed).count();
    lines.push(Line::from(format!(
        "{} interview stage(s), {} open   {} follow-up(s), {} open",
        state.stages.len(),
        open_stages,
        state.followups.len(),
        open_followups
    )));
    lines.push(Line::from(""));

    if let Some(notes) = &app.notes {
        lines.push(Line::from(Span::styled(
            "NOTES",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(notes, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    } else {
        lines.push(Line::from(Span::styled(
            "(No notes)",
            Style::default().fg(Color::DarkGray),
        )));
    }

    Text::from(lines)
}

fn build_interviews(state: &AppState) -> Text<'_> {
    if state.stages.is_empty() {
        return Text::from(Line::from(Span::styled(
            "(No interview stages - add one with: apptrack stage add <app-id> <title>)",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let mut lines: Vec<Line> = Vec::new();
    for (i, stage) in state.stages.iter().enumerate() {
        let marker = if i == state.stage_selected { ">" } else { " " };
        let when = stage
            .scheduled_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unscheduled".to_string());
        lines.push(Line::from(vec![
            Span::raw(format!("{} ", marker)),
            Span::styled(
                format!("[{}]", stage.outcome.label()),
                tone_style(stage.outcome.tone()),
            ),
            Span::styled(
                format!(" {}", stage.title),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  {}", when)),
        ]));
        if let Some(location) = &stage.location {
            lines.push(Line::from(format!("    @ {}", location)));
        }
        if let Some(notes) = &stage.notes {
            for line in textwrap::fill(notes, 66).lines() {
                lines.push(Line::from(format!("    {}", line)));
            }
        }
    }
    Text::from(lines)
}

fn build_followups(state: &AppState) -> Text<'_> {
    if state.followups.is_empty() {
        return Text::from(Line::from(Span::styled(
            "(No follow-ups)",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let now = chrono::Utc::now();
    let mut lines: Vec<Line> = Vec::new();
    for (i, followup) in state.followups.iter().enumerate() {
        let marker = if i == state.followup_selected { ">" } else { " " };
        let check = if followup.completed { "[x]" } else { "[ ]" };
        let (due, style) = match followup.due_date {
            Some(due) if !followup.completed && due < now => (
                format!("  overdue since {}", due.format("%Y-%m-%d")),
                Style::default().fg(Color::Red),
            ),
            Some(due) => (format!("  due {}", due.format("%Y-%m-%d")), Style::default()),
            None => (String::new(), Style::default()),
        };
        let text_style = if followup.completed {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::raw(format!("{} {} ", marker, check)),
            Span::styled(followup.description.as_str(), text_style),
            Span::styled(due, style),
        ]));
    }
    Text::from(lines)
}

fn build_materials(state: &AppState) -> Text<'_> {
    let Some(app) = state.current_app() else {
        return Text::raw("No application selected");
    };
    Text::from(vec![
        Line::from(format!("Resume:       {}", state.document_name(app.resume_id))),
        Line::from(format!(
            "Cover letter: {}",
            state.document_name(app.cover_letter_id)
        )),
    ])
}
