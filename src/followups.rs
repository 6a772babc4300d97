use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use tracing::info;

use crate::confirm::{Confirm, Deletion};
use crate::error::{Error, Result};
use crate::models::{require_text, FollowupAction, Identity};
use crate::store::Store;

pub struct FollowupManager<'a, S: Store + ?Sized> {
    store: &'a S,
    who: Option<&'a Identity>,
}

impl<'a, S: Store + ?Sized> FollowupManager<'a, S> {
    pub fn new(store: &'a S, who: Option<&'a Identity>) -> Self {
        Self { store, who }
    }

    fn identity(&self) -> Result<&'a Identity> {
        self.who.ok_or(Error::SignedOut)
    }

    fn fetch(&self, who: &Identity, id: i64) -> Result<FollowupAction> {
        self.store
            .get_followup(who, id)?
            .ok_or(Error::not_found("Follow-up", id))
    }

    pub fn add_followup(
        &self,
        application_id: i64,
        description: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<FollowupAction> {
        let who = self.identity()?;
        let description = require_text("follow-up description", description)?;
        let id = self
            .store
            .create_followup(who, application_id, &description, due_date)?;
        info!(id, application_id, "follow-up added");
        self.fetch(who, id)
    }

    pub fn toggle_completed(&self, id: i64) -> Result<FollowupAction> {
        let who = self.identity()?;
        let current = self.fetch(who, id)?;
        self.store
            .set_followup_completed(who, id, !current.completed)?;
        info!(id, completed = !current.completed, "follow-up toggled");
        self.fetch(who, id)
    }

    pub fn delete_followup(&self, id: i64, confirm: &mut dyn Confirm) -> Result<Deletion> {
        let who = self.identity()?;
        let followup = self.fetch(who, id)?;
        if !confirm.confirm(&format!("Delete follow-up '{}'?", followup.description)) {
            return Ok(Deletion::Declined);
        }
        self.store.delete_followup(who, id)?;
        info!(id, "follow-up deleted");
        Ok(Deletion::Deleted)
    }

    /// In display order. Empty when signed out.
    pub fn followups_for(&self, application_id: i64) -> Result<Vec<FollowupAction>> {
        let Some(who) = self.who else {
            return Ok(Vec::new());
        };
        let mut followups = self.store.followups_for_application(who, application_id)?;
        sort_for_display(&mut followups);
        Ok(followups)
    }

    pub fn all(&self) -> Result<Vec<FollowupAction>> {
        let Some(who) = self.who else {
            return Ok(Vec::new());
        };
        let mut followups = self.store.all_followups(who)?;
        sort_for_display(&mut followups);
        Ok(followups)
    }
}

/// Open items first, dated before undated, soonest due first, then newest.
pub fn display_order(a: &FollowupAction, b: &FollowupAction) -> Ordering {
    a.completed
        .cmp(&b.completed)
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}

pub fn sort_for_display(followups: &mut [FollowupAction]) {
    followups.sort_by(display_order);
}

pub fn overdue(followups: &[FollowupAction], now: DateTime<Utc>) -> Vec<&FollowupAction> {
    followups
        .iter()
        .filter(|f| !f.completed && f.due_date.is_some_and(|due| due < now))
        .collect()
}
