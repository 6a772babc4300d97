use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::followups::overdue;
use crate::models::{ApplicationFilter, Identity};
use crate::stages::upcoming;
use crate::status::ApplicationStatus;
use crate::store::Store;

/// Dashboard counts for one identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub by_status: BTreeMap<&'static str, usize>,
    pub total: usize,
    pub upcoming_interviews: usize,
    pub open_followups: usize,
    pub overdue_followups: usize,
}

impl Summary {
    pub fn collect<S: Store + ?Sized>(
        store: &S,
        who: Option<&Identity>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let Some(who) = who else {
            return Ok(Self::default());
        };

        let apps = store.list_applications(who, ApplicationFilter::default())?;
        let mut by_status: BTreeMap<&'static str, usize> = ApplicationStatus::ALL
            .iter()
            .map(|s| (s.as_str(), 0))
            .collect();
        for app in &apps {
            *by_status.entry(app.status.as_str()).or_default() += 1;
        }

        let followups = store.all_followups(who)?;
        Ok(Self {
            by_status,
            total: apps.len(),
            upcoming_interviews: upcoming([store.all_stages(who)?], now).len(),
            open_followups: followups.iter().filter(|f| !f.completed).count(),
            overdue_followups: overdue(&followups, now).len(),
        })
    }
}
