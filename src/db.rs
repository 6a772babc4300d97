use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, ToSql};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::migrations::MigrationManager;
use crate::models::{
    Application, ApplicationFilter, ApplicationPatch, Document, DocumentKind, FollowupAction,
    Identity, InterviewStage, NewApplication, NewDocument, NewStage, StagePatch,
};
use crate::status::ApplicationStatus;
use crate::store::Store;

const APPLICATION_COLUMNS: &str = "id, company, job_title, status, url, notes, resume_id, \
     cover_letter_id, applied_at, created_at, updated_at";

const STAGE_COLUMNS: &str = "s.id, s.application_id, s.title, s.scheduled_at, s.location, \
     s.notes, s.outcome, s.created_at, s.updated_at";

const FOLLOWUP_COLUMNS: &str = "f.id, f.application_id, f.description, f.due_date, f.completed, \
     f.created_at, f.updated_at";

const DOCUMENT_COLUMNS: &str = "id, kind, name, content, notes, created_at, updated_at";

/// SQLite-backed store.
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::setup(conn, path.to_path_buf())
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::setup(conn, PathBuf::from(":memory:"))
    }

    fn setup(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        MigrationManager::migrate(&conn)?;
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn default_path() -> PathBuf {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "apptrack") {
            proj_dirs.data_dir().join("apptrack.db")
        } else {
            PathBuf::from("apptrack.db")
        }
    }

    pub fn schema_version(&self) -> Result<Option<u32>> {
        MigrationManager::current_version(&self.conn)
    }

    /// Runs `UPDATE <table> SET <sets>, updated_at = now WHERE <scope>` and
    /// reports NotFound when no row matched.
    fn apply_update(
        &self,
        table: &str,
        kind: &'static str,
        id: i64,
        scope: &str,
        who: &Identity,
        sets: Vec<(&str, &dyn ToSql)>,
    ) -> Result<()> {
        let now = Utc::now();

        let mut assignments: Vec<String> = Vec::with_capacity(sets.len() + 1);
        let mut values: Vec<&dyn ToSql> = Vec::with_capacity(sets.len() + 3);
        for (column, value) in sets {
            values.push(value);
            // `column` may already carry an expression using the placeholder
            if column.contains("{}") {
                assignments.push(column.replace("{}", &format!("?{}", values.len())));
            } else {
                assignments.push(format!("{} = ?{}", column, values.len()));
            }
        }
        values.push(&now);
        assignments.push(format!("updated_at = ?{}", values.len()));
        let id_idx = values.len() + 1;
        let user_idx = values.len() + 2;
        let user = who.as_str();
        values.push(&id);
        values.push(&user);

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{} AND {}",
            table,
            assignments.join(", "),
            id_idx,
            scope.replace("{user}", &format!("?{}", user_idx)),
        );
        debug!(%sql, "update");

        let changed = self.conn.execute(&sql, params_from_iter(values))?;
        if changed == 0 {
            return Err(Error::not_found(kind, id));
        }
        Ok(())
    }

    fn require_application(&self, who: &Identity, id: i64) -> Result<()> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM applications WHERE id = ?1 AND user_id = ?2",
                params![id, who.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match exists {
            Some(_) => Ok(()),
            None => Err(Error::not_found("Application", id)),
        }
    }

    fn row_to_application(row: &rusqlite::Row) -> rusqlite::Result<Application> {
        Ok(Application {
            id: row.get(0)?,
            company: row.get(1)?,
            job_title: row.get(2)?,
            status: row.get(3)?,
            url: row.get(4)?,
            notes: row.get(5)?,
            resume_id: row.get(6)?,
            cover_letter_id: row.get(7)?,
            applied_at: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn row_to_stage(row: &rusqlite::Row) -> rusqlite::Result<InterviewStage> {
        Ok(InterviewStage {
            id: row.get(0)?,
            application_id: row.get(1)?,
            title: row.get(2)?,
            scheduled_at: row.get(3)?,
            location: row.get(4)?,
            notes: row.get(5)?,
            outcome: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn row_to_followup(row: &rusqlite::Row) -> rusqlite::Result<FollowupAction> {
        Ok(FollowupAction {
            id: row.get(0)?,
            application_id: row.get(1)?,
            description: row.get(2)?,
            due_date: row.get(3)?,
            completed: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
        Ok(Document {
            id: row.get(0)?,
            kind: row.get(1)?,
            name: row.get(2)?,
            content: row.get(3)?,
            notes: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

const OWNED_APPLICATION: &str = "user_id = {user}";
const OWNED_CHILD: &str = "application_id IN (SELECT id FROM applications WHERE user_id = {user})";

impl Store for Database {
    // --- Application operations ---

    fn create_application(
        &self,
        who: &Identity,
        fields: &NewApplication,
        status: ApplicationStatus,
    ) -> Result<i64> {
        let now = Utc::now();
        let applied_at = (status == ApplicationStatus::Applied).then_some(now);
        self.conn.execute(
            "INSERT INTO applications
                (user_id, company, job_title, status, url, notes, resume_id, cover_letter_id,
                 applied_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                who.as_str(),
                fields.company,
                fields.job_title,
                status,
                fields.url,
                fields.notes,
                fields.resume_id,
                fields.cover_letter_id,
                applied_at,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_application(&self, who: &Identity, id: i64, patch: &ApplicationPatch) -> Result<()> {
        let now = Utc::now();
        let mut sets: Vec<(&str, &dyn ToSql)> = Vec::new();
        if let Some(company) = &patch.company {
            sets.push(("company", company));
        }
        if let Some(job_title) = &patch.job_title {
            sets.push(("job_title", job_title));
        }
        if let Some(status) = &patch.status {
            sets.push(("status", status));
            if *status == ApplicationStatus::Applied {
                sets.push(("applied_at = COALESCE(applied_at, {})", &now));
            }
        }
        if let Some(url) = &patch.url {
            sets.push(("url", url));
        }
        if let Some(notes) = &patch.notes {
            sets.push(("notes", notes));
        }
        if let Some(resume_id) = &patch.resume_id {
            sets.push(("resume_id", resume_id));
        }
        if let Some(cover_letter_id) = &patch.cover_letter_id {
            sets.push(("cover_letter_id", cover_letter_id));
        }
        self.apply_update("applications", "Application", id, OWNED_APPLICATION, who, sets)
    }

    fn get_application(&self, who: &Identity, id: i64) -> Result<Option<Application>> {
        let sql = format!(
            "SELECT {} FROM applications WHERE id = ?1 AND user_id = ?2",
            APPLICATION_COLUMNS
        );
        let result = self
            .conn
            .query_row(&sql, params![id, who.as_str()], Self::row_to_application)
            .optional()?;
        Ok(result)
    }

    fn list_applications(
        &self,
        who: &Identity,
        filter: ApplicationFilter,
    ) -> Result<Vec<Application>> {
        let mut sql = format!(
            "SELECT {} FROM applications WHERE user_id = ?1",
            APPLICATION_COLUMNS
        );
        if filter.status.is_some() {
            sql.push_str(" AND status = ?2");
        }
        sql.push_str(" ORDER BY updated_at DESC, id DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = match filter.status {
            Some(status) => stmt.query_map(params![who.as_str(), status], Self::row_to_application)?,
            None => stmt.query_map(params![who.as_str()], Self::row_to_application)?,
        };
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn delete_application(&self, who: &Identity, id: i64) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM applications WHERE id = ?1 AND user_id = ?2",
            params![id, who.as_str()],
        )?;
        if changed == 0 {
            return Err(Error::not_found("Application", id));
        }
        Ok(())
    }

    // --- Interview stage operations ---

    fn stages_for_application(
        &self,
        who: &Identity,
        application_id: i64,
    ) -> Result<Vec<InterviewStage>> {
        let sql = format!(
            "SELECT {} FROM interview_stages s
             JOIN applications a ON a.id = s.application_id
             WHERE s.application_id = ?1 AND a.user_id = ?2
             ORDER BY s.scheduled_at IS NULL, s.scheduled_at, s.id",
            STAGE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![application_id, who.as_str()], Self::row_to_stage)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn all_stages(&self, who: &Identity) -> Result<Vec<InterviewStage>> {
        let sql = format!(
            "SELECT {} FROM interview_stages s
             JOIN applications a ON a.id = s.application_id
             WHERE a.user_id = ?1
             ORDER BY s.scheduled_at IS NULL, s.scheduled_at, s.id",
            STAGE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![who.as_str()], Self::row_to_stage)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_stage(&self, who: &Identity, id: i64) -> Result<Option<InterviewStage>> {
        let sql = format!(
            "SELECT {} FROM interview_stages s
             JOIN applications a ON a.id = s.application_id
             WHERE s.id = ?1 AND a.user_id = ?2",
            STAGE_COLUMNS
        );
        let result = self
            .conn
            .query_row(&sql, params![id, who.as_str()], Self::row_to_stage)
            .optional()?;
        Ok(result)
    }

    fn create_stage(&self, who: &Identity, application_id: i64, stage: &NewStage) -> Result<i64> {
        self.require_application(who, application_id)?;
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO interview_stages
                (application_id, title, scheduled_at, location, notes, outcome,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?6)",
            params![
                application_id,
                stage.title,
                stage.scheduled_at,
                stage.location,
                stage.notes,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_stage(&self, who: &Identity, id: i64, patch: &StagePatch) -> Result<()> {
        let mut sets: Vec<(&str, &dyn ToSql)> = Vec::new();
        if let Some(title) = &patch.title {
            sets.push(("title", title));
        }
        if let Some(scheduled_at) = &patch.scheduled_at {
            sets.push(("scheduled_at", scheduled_at));
        }
        if let Some(location) = &patch.location {
            sets.push(("location", location));
        }
        if let Some(notes) = &patch.notes {
            sets.push(("notes", notes));
        }
        if let Some(outcome) = &patch.outcome {
            sets.push(("outcome", outcome));
        }
        self.apply_update("interview_stages", "Interview stage", id, OWNED_CHILD, who, sets)
    }

    fn delete_stage(&self, who: &Identity, id: i64) -> Result<()> {
        let changed = self.conn.execute(
            &format!(
                "DELETE FROM interview_stages WHERE id = ?1 AND {}",
                OWNED_CHILD.replace("{user}", "?2")
            ),
            params![id, who.as_str()],
        )?;
        if changed == 0 {
            return Err(Error::not_found("Interview stage", id));
        }
        Ok(())
    }

    // --- Follow-up operations ---

    fn followups_for_application(
        &self,
        who: &Identity,
        application_id: i64,
    ) -> Result<Vec<FollowupAction>> {
        let sql = format!(
            "SELECT {} FROM followups f
             JOIN applications a ON a.id = f.application_id
             WHERE f.application_id = ?1 AND a.user_id = ?2
             ORDER BY f.id",
            FOLLOWUP_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![application_id, who.as_str()], Self::row_to_followup)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn all_followups(&self, who: &Identity) -> Result<Vec<FollowupAction>> {
        let sql = format!(
            "SELECT {} FROM followups f
             JOIN applications a ON a.id = f.application_id
             WHERE a.user_id = ?1
             ORDER BY f.id",
            FOLLOWUP_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![who.as_str()], Self::row_to_followup)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_followup(&self, who: &Identity, id: i64) -> Result<Option<FollowupAction>> {
        let sql = format!(
            "SELECT {} FROM followups f
             JOIN applications a ON a.id = f.application_id
             WHERE f.id = ?1 AND a.user_id = ?2",
            FOLLOWUP_COLUMNS
        );
        let result = self
            .conn
            .query_row(&sql, params![id, who.as_str()], Self::row_to_followup)
            .optional()?;
        Ok(result)
    }

    fn create_followup(
        &self,
        who: &Identity,
        application_id: i64,
        description: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        self.require_application(who, application_id)?;
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO followups
                (application_id, description, due_date, completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?4)",
            params![application_id, description, due_date, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn set_followup_completed(&self, who: &Identity, id: i64, completed: bool) -> Result<()> {
        self.apply_update(
            "followups",
            "Follow-up",
            id,
            OWNED_CHILD,
            who,
            vec![("completed", &completed as &dyn ToSql)],
        )
    }

    fn delete_followup(&self, who: &Identity, id: i64) -> Result<()> {
        let changed = self.conn.execute(
            &format!(
                "DELETE FROM followups WHERE id = ?1 AND {}",
                OWNED_CHILD.replace("{user}", "?2")
            ),
            params![id, who.as_str()],
        )?;
        if changed == 0 {
            return Err(Error::not_found("Follow-up", id));
        }
        Ok(())
    }

    // --- Document operations ---

    fn documents(&self, who: &Identity, kind: DocumentKind) -> Result<Vec<Document>> {
        let sql = format!(
            "SELECT {} FROM documents WHERE user_id = ?1 AND kind = ?2 ORDER BY name",
            DOCUMENT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![who.as_str(), kind], Self::row_to_document)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_document(&self, who: &Identity, id: i64) -> Result<Option<Document>> {
        let sql = format!(
            "SELECT {} FROM documents WHERE id = ?1 AND user_id = ?2",
            DOCUMENT_COLUMNS
        );
        let result = self
            .conn
            .query_row(&sql, params![id, who.as_str()], Self::row_to_document)
            .optional()?;
        Ok(result)
    }

    fn create_document(&self, who: &Identity, doc: &NewDocument) -> Result<i64> {
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO documents (user_id, kind, name, content, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![who.as_str(), doc.kind, doc.name, doc.content, doc.notes, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StageOutcome;

    fn ada() -> Identity {
        Identity::new("ada").unwrap()
    }

    fn new_app(company: &str, title: &str) -> NewApplication {
        NewApplication {
            company: company.to_string(),
            job_title: title.to_string(),
            ..NewApplication::default()
        }
    }

    #[test]
    fn test_create_and_get_application() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .create_application(&ada(), &new_app("Acme", "Engineer"), ApplicationStatus::Saved)
            .unwrap();
        let app = db.get_application(&ada(), id).unwrap().unwrap();
        assert_eq!(app.company, "Acme");
        assert_eq!(app.status, ApplicationStatus::Saved);
        assert_eq!(app.applied_at, None);
        assert_eq!(app.created_at, app.updated_at);
    }

    #[test]
    fn test_other_identity_cannot_see_records() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .create_application(&ada(), &new_app("Acme", "Engineer"), ApplicationStatus::Saved)
            .unwrap();
        let bob = Identity::new("bob").unwrap();
        assert!(db.get_application(&bob, id).unwrap().is_none());
        assert!(db.list_applications(&bob, ApplicationFilter::default()).unwrap().is_empty());
        assert!(matches!(
            db.update_application(&bob, id, &ApplicationPatch::status(ApplicationStatus::Offer)),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            db.create_stage(&bob, id, &NewStage { title: "Screen".into(), ..NewStage::default() }),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_update_sets_applied_at_once() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .create_application(&ada(), &new_app("Acme", "Engineer"), ApplicationStatus::Saved)
            .unwrap();
        db.update_application(&ada(), id, &ApplicationPatch::status(ApplicationStatus::Applied))
            .unwrap();
        let first = db.get_application(&ada(), id).unwrap().unwrap().applied_at;
        assert!(first.is_some());

        db.update_application(&ada(), id, &ApplicationPatch::status(ApplicationStatus::Saved))
            .unwrap();
        db.update_application(&ada(), id, &ApplicationPatch::status(ApplicationStatus::Applied))
            .unwrap();
        let again = db.get_application(&ada(), id).unwrap().unwrap().applied_at;
        assert_eq!(first, again);
    }

    #[test]
    fn test_update_clears_optional_fields() {
        let db = Database::open_in_memory().unwrap();
        let mut fields = new_app("Acme", "Engineer");
        fields.notes = Some("referral".into());
        let id = db
            .create_application(&ada(), &fields, ApplicationStatus::Saved)
            .unwrap();
        let patch = ApplicationPatch {
            notes: Some(None),
            ..ApplicationPatch::default()
        };
        db.update_application(&ada(), id, &patch).unwrap();
        assert_eq!(db.get_application(&ada(), id).unwrap().unwrap().notes, None);
    }

    #[test]
    fn test_list_filters_by_status() {
        let db = Database::open_in_memory().unwrap();
        db.create_application(&ada(), &new_app("Acme", "Engineer"), ApplicationStatus::Saved)
            .unwrap();
        db.create_application(&ada(), &new_app("Globex", "SRE"), ApplicationStatus::Applied)
            .unwrap();
        let applied = db
            .list_applications(
                &ada(),
                ApplicationFilter {
                    status: Some(ApplicationStatus::Applied),
                },
            )
            .unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].company, "Globex");
        assert_eq!(db.list_applications(&ada(), ApplicationFilter::default()).unwrap().len(), 2);
    }

    #[test]
    fn test_delete_application_cascades() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .create_application(&ada(), &new_app("Acme", "Engineer"), ApplicationStatus::Saved)
            .unwrap();
        let stage = NewStage {
            title: "Phone Screen".into(),
            ..NewStage::default()
        };
        db.create_stage(&ada(), id, &stage).unwrap();
        db.create_followup(&ada(), id, "Send thank-you note", None).unwrap();

        db.delete_application(&ada(), id).unwrap();
        assert!(db.all_stages(&ada()).unwrap().is_empty());
        assert!(db.all_followups(&ada()).unwrap().is_empty());
        assert!(matches!(
            db.delete_application(&ada(), id),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_followup_completed_flag_is_scoped() {
        let db = Database::open_in_memory().unwrap();
        let app_id = db
            .create_application(&ada(), &new_app("Acme", "Engineer"), ApplicationStatus::Saved)
            .unwrap();
        let id = db.create_followup(&ada(), app_id, "Send thank-you note", None).unwrap();

        db.set_followup_completed(&ada(), id, true).unwrap();
        let done = db.get_followup(&ada(), id).unwrap().unwrap();
        assert!(done.completed);
        assert_eq!(done.description, "Send thank-you note");

        let bob = Identity::new("bob").unwrap();
        assert!(matches!(
            db.set_followup_completed(&bob, id, false),
            Err(Error::NotFound { .. })
        ));
        assert!(db.get_followup(&ada(), id).unwrap().unwrap().completed);
    }

    #[test]
    fn test_stage_round_trip_and_outcome_update() {
        let db = Database::open_in_memory().unwrap();
        let app = db
            .create_application(&ada(), &new_app("Acme", "Engineer"), ApplicationStatus::Applied)
            .unwrap();
        let when = Utc::now() + chrono::Duration::days(2);
        let id = db
            .create_stage(
                &ada(),
                app,
                &NewStage {
                    title: "Onsite".into(),
                    scheduled_at: Some(when),
                    location: Some("HQ".into()),
                    notes: None,
                },
            )
            .unwrap();
        let patch = StagePatch {
            outcome: Some(StageOutcome::Passed),
            ..StagePatch::default()
        };
        db.update_stage(&ada(), id, &patch).unwrap();

        let stage = db.get_stage(&ada(), id).unwrap().unwrap();
        assert_eq!(stage.outcome, StageOutcome::Passed);
        assert_eq!(stage.scheduled_at, Some(when));
        assert_eq!(stage.location.as_deref(), Some("HQ"));
    }

    #[test]
    fn test_stages_order_unscheduled_last() {
        let db = Database::open_in_memory().unwrap();
        let app = db
            .create_application(&ada(), &new_app("Acme", "Engineer"), ApplicationStatus::Applied)
            .unwrap();
        let later = Utc::now() + chrono::Duration::days(5);
        let sooner = Utc::now() + chrono::Duration::days(1);
        for (title, when) in [("Final", Some(later)), ("Tbd", None), ("Screen", Some(sooner))] {
            db.create_stage(
                &ada(),
                app,
                &NewStage {
                    title: title.into(),
                    scheduled_at: when,
                    ..NewStage::default()
                },
            )
            .unwrap();
        }
        let titles: Vec<String> = db
            .stages_for_application(&ada(), app)
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["Screen", "Final", "Tbd"]);
    }

    #[test]
    fn test_documents_by_kind() {
        let db = Database::open_in_memory().unwrap();
        db.create_document(
            &ada(),
            &NewDocument {
                kind: DocumentKind::Resume,
                name: "Backend".into(),
                content: "# Ada".into(),
                notes: None,
            },
        )
        .unwrap();
        db.create_document(
            &ada(),
            &NewDocument {
                kind: DocumentKind::CoverLetter,
                name: "Generic".into(),
                content: "Dear team".into(),
                notes: None,
            },
        )
        .unwrap();
        assert_eq!(db.resumes(&ada()).unwrap().len(), 1);
        assert_eq!(db.cover_letters(&ada()).unwrap()[0].name, "Generic");
    }

    #[test]
    fn test_schema_version_is_latest() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(
            db.schema_version().unwrap(),
            Some(crate::migrations::LATEST_VERSION)
        );
    }
}
