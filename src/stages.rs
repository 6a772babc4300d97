//! Interview stages owned by an application, and the upcoming-interviews query.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::info;

use crate::confirm::{Confirm, Deletion};
use crate::error::{Error, Result};
use crate::models::{optional_text, require_text, Identity, InterviewStage, NewStage, StagePatch};
use crate::status::StageOutcome;
use crate::store::Store;

pub struct StageManager<'a, S: Store + ?Sized> {
    store: &'a S,
    who: Option<&'a Identity>,
}

impl<'a, S: Store + ?Sized> StageManager<'a, S> {
    pub fn new(store: &'a S, who: Option<&'a Identity>) -> Self {
        Self { store, who }
    }

    fn identity(&self) -> Result<&'a Identity> {
        self.who.ok_or(Error::SignedOut)
    }

    fn fetch(&self, who: &Identity, id: i64) -> Result<InterviewStage> {
        self.store
            .get_stage(who, id)?
            .ok_or(Error::not_found("Interview stage", id))
    }

    pub fn add_stage(&self, application_id: i64, stage: NewStage) -> Result<InterviewStage> {
        let who = self.identity()?;
        let stage = NewStage {
            title: require_text("stage title", &stage.title)?,
            location: optional_text(stage.location),
            notes: optional_text(stage.notes),
            ..stage
        };
        let id = self.store.create_stage(who, application_id, &stage)?;
        info!(id, application_id, title = %stage.title, "interview stage added");
        self.fetch(who, id)
    }

    pub fn update_stage(&self, id: i64, patch: StagePatch) -> Result<InterviewStage> {
        let who = self.identity()?;
        let patch = StagePatch {
            title: patch
                .title
                .map(|t| require_text("stage title", &t))
                .transpose()?,
            location: patch.location.map(optional_text),
            notes: patch.notes.map(optional_text),
            ..patch
        };
        if patch == StagePatch::default() {
            return self.fetch(who, id);
        }
        self.store.update_stage(who, id, &patch)?;
        self.fetch(who, id)
    }

    /// Direct set, as from a dropdown.
    pub fn set_outcome(&self, id: i64, outcome: StageOutcome) -> Result<InterviewStage> {
        let stage = self.update_stage(
            id,
            StagePatch {
                outcome: Some(outcome),
                ..StagePatch::default()
            },
        )?;
        info!(id, %outcome, "interview outcome set");
        Ok(stage)
    }

    /// Advances to the next outcome in the cycle, as from a click on the badge.
    pub fn cycle_outcome(&self, id: i64) -> Result<InterviewStage> {
        let who = self.identity()?;
        let current = self.fetch(who, id)?;
        self.set_outcome(id, current.outcome.next())
    }

    pub fn delete_stage(&self, id: i64, confirm: &mut dyn Confirm) -> Result<Deletion> {
        let who = self.identity()?;
        let stage = self.fetch(who, id)?;
        if !confirm.confirm(&format!("Delete interview stage '{}'?", stage.title)) {
            return Ok(Deletion::Declined);
        }
        self.store.delete_stage(who, id)?;
        info!(id, "interview stage deleted");
        Ok(Deletion::Deleted)
    }

    /// Scheduled stages first by date, unscheduled last. Empty when signed out.
    pub fn stages_for(&self, application_id: i64) -> Result<Vec<InterviewStage>> {
        match self.who {
            Some(who) => self.store.stages_for_application(who, application_id),
            None => Ok(Vec::new()),
        }
    }

    pub fn upcoming(&self, now: DateTime<Utc>) -> Result<Upcoming> {
        match self.who {
            Some(who) => Ok(upcoming([self.store.all_stages(who)?], now)),
            None => Ok(Upcoming::default()),
        }
    }
}

/// Open stages scheduled strictly after a reference time, soonest first.
///
/// The list is materialized when `upcoming` runs, not produced lazily. It is
/// a snapshot: later store writes do not show up in it, and `iter()` starts
/// over from the first stage on every call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Upcoming {
    stages: Vec<InterviewStage>,
}

impl Upcoming {
    pub fn iter(&self) -> std::slice::Iter<'_, InterviewStage> {
        self.stages.iter()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn next_for(&self, application_id: i64) -> Option<&InterviewStage> {
        self.iter().find(|s| s.application_id == application_id)
    }
}

impl<'a> IntoIterator for &'a Upcoming {
    type Item = &'a InterviewStage;
    type IntoIter = std::slice::Iter<'a, InterviewStage>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Merges stage collections that may hold the same record more than once,
/// keeping the first copy of each id, and keeps open stages scheduled after
/// `now`, ordered by `scheduled_at` then id.
pub fn upcoming<I, C>(sources: I, now: DateTime<Utc>) -> Upcoming
where
    I: IntoIterator<Item = C>,
    C: IntoIterator<Item = InterviewStage>,
{
    let mut seen = HashSet::new();
    let mut stages: Vec<InterviewStage> = sources
        .into_iter()
        .flatten()
        .filter(|s| seen.insert(s.id))
        .filter(|s| s.outcome.is_open() && s.scheduled_at.is_some_and(|at| at > now))
        .collect();
    stages.sort_by_key(|s| (s.scheduled_at, s.id));
    Upcoming { stages }
}
