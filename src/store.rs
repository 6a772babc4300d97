//! The persistence collaborator. Managers only ever talk to a `Store`; the
//! shipped implementation is `db::Database`.

use crate::error::Result;
use crate::models::{
    Application, ApplicationFilter, ApplicationPatch, Document, DocumentKind, FollowupAction,
    Identity, InterviewStage, NewApplication, NewDocument, NewStage, StagePatch,
};
use crate::status::ApplicationStatus;

/// Every call is scoped by the caller's identity. Records belonging to
/// another identity are reported as not found.
pub trait Store {
    /// `status` is decided by the caller; the store only persists it.
    fn create_application(
        &self,
        who: &Identity,
        fields: &NewApplication,
        status: ApplicationStatus,
    ) -> Result<i64>;
    fn update_application(&self, who: &Identity, id: i64, patch: &ApplicationPatch) -> Result<()>;
    fn get_application(&self, who: &Identity, id: i64) -> Result<Option<Application>>;
    fn list_applications(&self, who: &Identity, filter: ApplicationFilter)
        -> Result<Vec<Application>>;
    /// Removes the application together with its stages and follow-ups.
    fn delete_application(&self, who: &Identity, id: i64) -> Result<()>;

    fn stages_for_application(&self, who: &Identity, application_id: i64)
        -> Result<Vec<InterviewStage>>;
    fn all_stages(&self, who: &Identity) -> Result<Vec<InterviewStage>>;
    fn get_stage(&self, who: &Identity, id: i64) -> Result<Option<InterviewStage>>;
    fn create_stage(&self, who: &Identity, application_id: i64, stage: &NewStage) -> Result<i64>;
    fn update_stage(&self, who: &Identity, id: i64, patch: &StagePatch) -> Result<()>;
    fn delete_stage(&self, who: &Identity, id: i64) -> Result<()>;

    fn followups_for_application(
        &self,
        who: &Identity,
        application_id: i64,
    ) -> Result<Vec<FollowupAction>>;
    fn all_followups(&self, who: &Identity) -> Result<Vec<FollowupAction>>;
    fn get_followup(&self, who: &Identity, id: i64) -> Result<Option<FollowupAction>>;
    fn create_followup(
        &self,
        who: &Identity,
        application_id: i64,
        description: &str,
        due_date: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<i64>;
    fn set_followup_completed(&self, who: &Identity, id: i64, completed: bool) -> Result<()>;
    fn delete_followup(&self, who: &Identity, id: i64) -> Result<()>;

    fn documents(&self, who: &Identity, kind: DocumentKind) -> Result<Vec<Document>>;
    fn get_document(&self, who: &Identity, id: i64) -> Result<Option<Document>>;
    fn create_document(&self, who: &Identity, doc: &NewDocument) -> Result<i64>;

    fn resumes(&self, who: &Identity) -> Result<Vec<Document>> {
        self.documents(who, DocumentKind::Resume)
    }

    fn cover_letters(&self, who: &Identity) -> Result<Vec<Document>> {
        self.documents(who, DocumentKind::CoverLetter)
    }
}
