//! Schema versions, applied in order on every open.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::Result;

const V1_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS applications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    company TEXT NOT NULL,
    job_title TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'saved'
        CHECK (status IN ('saved', 'applied', 'interview', 'offer', 'rejected')),
    url TEXT,
    notes TEXT,
    resume_id INTEGER,
    cover_letter_id INTEGER,
    applied_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS interview_stages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    application_id INTEGER NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    scheduled_at TEXT,
    location TEXT,
    notes TEXT,
    outcome TEXT NOT NULL DEFAULT 'pending'
        CHECK (outcome IN ('pending', 'scheduled', 'passed', 'failed')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS followups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    application_id INTEGER NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
    description TEXT NOT NULL,
    due_date TEXT,
    completed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('resume', 'cover_letter')),
    name TEXT NOT NULL,
    content TEXT NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_applications_user ON applications(user_id);
CREATE INDEX IF NOT EXISTS idx_applications_status ON applications(status);
CREATE INDEX IF NOT EXISTS idx_stages_application ON interview_stages(application_id);
CREATE INDEX IF NOT EXISTS idx_followups_application ON followups(application_id);
CREATE INDEX IF NOT EXISTS idx_documents_user ON documents(user_id, kind);
"#;

pub const LATEST_VERSION: u32 = 2;

pub struct MigrationManager;

impl MigrationManager {
    pub fn migrate(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;

        let current = Self::current_version(conn)?.unwrap_or(0);
        debug!(current, latest = LATEST_VERSION, "checking schema version");

        if current < 1 {
            conn.execute_batch(V1_SCHEMA)?;
            Self::record(conn, 1)?;
        }
        if current < 2 {
            let merged = Self::merge_legacy_rounds(conn)?;
            if merged > 0 {
                info!(merged, "merged legacy interview rounds into interview_stages");
            }
            Self::record(conn, 2)?;
        }

        Ok(())
    }

    pub fn current_version(conn: &Connection) -> Result<Option<u32>> {
        let version: Option<u32> = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .optional()?
            .flatten();
        Ok(version)
    }

    fn record(conn: &Connection, version: u32) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO schema_migrations (version) VALUES (?1)",
            params![version],
        )?;
        Ok(())
    }

    /// Older builds wrote some stages to `interview_rounds` as well as to
    /// `interview_stages`. Fold them into the canonical table once, keeping
    /// the canonical row when both locations hold the same id.
    fn merge_legacy_rounds(conn: &Connection) -> Result<usize> {
        let legacy: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='interview_rounds'",
            [],
            |row| row.get(0),
        )?;
        if legacy == 0 {
            return Ok(0);
        }

        let merged = conn.execute(
            r#"
            INSERT OR IGNORE INTO interview_stages
                (id, application_id, title, scheduled_at, location, notes, outcome,
                 created_at, updated_at)
            SELECT r.id, r.application_id, r.title, r.scheduled_at, r.location, r.notes,
                   r.outcome, r.created_at, r.updated_at
            FROM interview_rounds r
            WHERE r.application_id IN (SELECT id FROM applications)
            "#,
            [],
        )?;
        conn.execute_batch("DROP TABLE interview_rounds;")?;
        Ok(merged)
    }
}
