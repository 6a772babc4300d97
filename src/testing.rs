//! Test doubles shared by the manager tests.

use chrono::{DateTime, Utc};
use std::cell::Cell;

use crate::confirm::Confirm;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    Application, ApplicationFilter, ApplicationPatch, Document, DocumentKind, FollowupAction,
    Identity, InterviewStage, NewApplication, NewDocument, NewStage, StagePatch,
};
use crate::status::ApplicationStatus;
use crate::store::Store;

/// Declines every prompt.
pub struct Decline;

impl Confirm for Decline {
    fn confirm(&mut self, _prompt: &str) -> bool {
        false
    }
}

/// In-memory database that can be switched into an "unreachable" mode where
/// every call fails with `Error::Unavailable`.
pub struct FlakyStore {
    db: Database,
    offline: Cell<bool>,
    pub calls: Cell<usize>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            db: Database::open_in_memory().expect("in-memory database"),
            offline: Cell::new(false),
            calls: Cell::new(0),
        }
    }

    pub fn go_offline(&self) {
        self.offline.set(true);
    }

    pub fn go_online(&self) {
        self.offline.set(false);
    }

    fn reach(&self) -> Result<&Database> {
        self.calls.set(self.calls.get() + 1);
        if self.offline.get() {
            Err(Error::Unavailable("connection refused".into()))
        } else {
            Ok(&self.db)
        }
    }
}

impl Store for FlakyStore {
    fn create_application(
        &self,
        who: &Identity,
        fields: &NewApplication,
        status: ApplicationStatus,
    ) -> Result<i64> {
        self.reach()?.create_application(who, fields, status)
    }

    fn update_application(&self, who: &Identity, id: i64, patch: &ApplicationPatch) -> Result<()> {
        self.reach()?.update_application(who, id, patch)
    }

    fn get_application(&self, who: &Identity, id: i64) -> Result<Option<Application>> {
        self.reach()?.get_application(who, id)
    }

    fn list_applications(
        &self,
        who: &Identity,
        filter: ApplicationFilter,
    ) -> Result<Vec<Application>> {
        self.reach()?.list_applications(who, filter)
    }

    fn delete_application(&self, who: &Identity, id: i64) -> Result<()> {
        self.reach()?.delete_application(who, id)
    }

    fn stages_for_application(
        &self,
        who: &Identity,
        application_id: i64,
    ) -> Result<Vec<InterviewStage>> {
        self.reach()?.stages_for_application(who, application_id)
    }

    fn all_stages(&self, who: &Identity) -> Result<Vec<InterviewStage>> {
        self.reach()?.all_stages(who)
    }

    fn get_stage(&self, who: &Identity, id: i64) -> Result<Option<InterviewStage>> {
        self.reach()?.get_stage(who, id)
    }

    fn create_stage(&self, who: &Identity, application_id: i64, stage: &NewStage) -> Result<i64> {
        self.reach()?.create_stage(who, application_id, stage)
    }

    fn update_stage(&self, who: &Identity, id: i64, patch: &StagePatch) -> Result<()> {
        self.reach()?.update_stage(who, id, patch)
    }

    fn delete_stage(&self, who: &Identity, id: i64) -> Result<()> {
        self.reach()?.delete_stage(who, id)
    }

    fn followups_for_application(
        &self,
        who: &Identity,
        application_id: i64,
    ) -> Result<Vec<FollowupAction>> {
        self.reach()?.followups_for_application(who, application_id)
    }

    fn all_followups(&self, who: &Identity) -> Result<Vec<FollowupAction>> {
        self.reach()?.all_followups(who)
    }

    fn get_followup(&self, who: &Identity, id: i64) -> Result<Option<FollowupAction>> {
        self.reach()?.get_followup(who, id)
    }

    fn create_followup(
        &self,
        who: &Identity,
        application_id: i64,
        description: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        self.reach()?
            .create_followup(who, application_id, description, due_date)
    }

    fn set_followup_completed(&self, who: &Identity, id: i64, completed: bool) -> Result<()> {
        self.reach()?.set_followup_completed(who, id, completed)
    }

    fn delete_followup(&self, who: &Identity, id: i64) -> Result<()> {
        self.reach()?.delete_followup(who, id)
    }

    fn documents(&self, who: &Identity, kind: DocumentKind) -> Result<Vec<Document>> {
        self.reach()?.documents(who, kind)
    }

    fn get_document(&self, who: &Identity, id: i64) -> Result<Option<Document>> {
        self.reach()?.get_document(who, id)
    }

    fn create_document(&self, who: &Identity, doc: &NewDocument) -> Result<i64> {
        self.reach()?.create_document(who, doc)
    }
}
