//! Application records: create, update, lookup, listing and deletion, with a
//! cache fallback for reads when the store is unavailable.

use tracing::{info, warn};
use url::Url;

use crate::cache::ReadCache;
use crate::confirm::{Confirm, Deletion};
use crate::error::{Error, Result};
use crate::models::{
    optional_text, require_text, Application, ApplicationFilter, ApplicationPatch, Identity,
    NewApplication,
};
use crate::status::ApplicationStatus;
use crate::store::Store;

/// Accepts only absolute `http`/`https` URLs with a host.
pub fn validate_url(url: Option<String>) -> Result<Option<String>> {
    let Some(url) = optional_text(url) else {
        return Ok(None);
    };
    let parsed = Url::parse(&url)
        .map_err(|e| Error::validation(format!("url '{}' is not valid: {}", url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host().is_none() {
        return Err(Error::validation(format!(
            "url must be an absolute http(s) URL, got '{}'",
            url
        )));
    }
    Ok(Some(url))
}

/// Trims and checks a new application before it reaches the store.
fn normalize_new(fields: NewApplication) -> Result<NewApplication> {
    Ok(NewApplication {
        company: require_text("company", &fields.company)?,
        job_title: require_text("job title", &fields.job_title)?,
        url: validate_url(fields.url)?,
        notes: optional_text(fields.notes),
        ..fields
    })
}

fn normalize_patch(patch: ApplicationPatch) -> Result<ApplicationPatch> {
    Ok(ApplicationPatch {
        company: patch
            .company
            .map(|c| require_text("company", &c))
            .transpose()?,
        job_title: patch
            .job_title
            .map(|t| require_text("job title", &t))
            .transpose()?,
        url: patch.url.map(validate_url).transpose()?,
        notes: patch.notes.map(optional_text),
        ..patch
    })
}

pub struct ApplicationManager<'a, S: Store + ?Sized> {
    store: &'a S,
    who: Option<&'a Identity>,
    cache: Option<&'a ReadCache>,
}

impl<'a, S: Store + ?Sized> ApplicationManager<'a, S> {
    pub fn new(store: &'a S, who: Option<&'a Identity>) -> Self {
        Self {
            store,
            who,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: &'a ReadCache) -> Self {
        self.cache = Some(cache);
        self
    }

    fn identity(&self) -> Result<&'a Identity> {
        self.who.ok_or(Error::SignedOut)
    }

    /// Starts in `saved`, or in `applied` with `applied_at` set to the creation
    /// time when `mark_applied` is set.
    pub fn create(&self, fields: NewApplication) -> Result<Application> {
        let who = self.identity()?;
        let fields = normalize_new(fields)?;
        let status = if fields.mark_applied {
            ApplicationStatus::Applied
        } else {
            ApplicationStatus::Saved
        };

        let id = self.store.create_application(who, &fields, status)?;
        info!(id, company = %fields.company, %status, "application created");

        let app = self
            .store
            .get_application(who, id)?
            .ok_or(Error::not_found("Application", id))?;
        if let Some(cache) = self.cache {
            cache.put(who, &app);
            cache.invalidate_listing(who);
        }
        Ok(app)
    }

    /// Any status may follow any other; the status field is an operator
    /// override with no transition table.
    pub fn update(&self, id: i64, patch: ApplicationPatch) -> Result<Application> {
        let who = self.identity()?;
        let patch = normalize_patch(patch)?;
        if patch.is_empty() {
            return self.get(id);
        }

        self.store.update_application(who, id, &patch)?;
        info!(id, ?patch.status, "application updated");

        let app = self
            .store
            .get_application(who, id)?
            .ok_or(Error::not_found("Application", id))?;
        if let Some(cache) = self.cache {
            cache.put(who, &app);
        }
        Ok(app)
    }

    pub fn set_status(&self, id: i64, status: ApplicationStatus) -> Result<Application> {
        self.update(id, ApplicationPatch::status(status))
    }

    /// `None` when signed out or when the id does not resolve.
    pub fn find(&self, id: i64) -> Result<Option<Application>> {
        let Some(who) = self.who else {
            return Ok(None);
        };
        match self.store.get_application(who, id) {
            Ok(Some(app)) => {
                if let Some(cache) = self.cache {
                    cache.put(who, &app);
                }
                Ok(Some(app))
            }
            Ok(None) => {
                if let Some(cache) = self.cache {
                    cache.invalidate(who, id);
                }
                Ok(None)
            }
            Err(e) if e.is_transient() => match self.cache.and_then(|c| c.get(who, id)) {
                Some(app) => {
                    warn!(id, error = %e, "store unavailable, serving cached application");
                    Ok(Some(app))
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    pub fn get(&self, id: i64) -> Result<Application> {
        self.find(id)?.ok_or(Error::not_found("Application", id))
    }

    /// Newest-updated first. Empty when signed out.
    pub fn list(&self, filter: ApplicationFilter) -> Result<Vec<Application>> {
        let Some(who) = self.who else {
            return Ok(Vec::new());
        };
        match self.store.list_applications(who, filter) {
            Ok(apps) => {
                if let Some(cache) = self.cache {
                    if filter.status.is_none() {
                        cache.put_listing(who, &apps);
                    } else {
                        apps.iter().for_each(|app| cache.put(who, app));
                    }
                }
                Ok(apps)
            }
            Err(e) if e.is_transient() => match self.cache.and_then(|c| c.listing(who)) {
                Some(apps) => {
                    warn!(error = %e, "store unavailable, serving cached application list");
                    Ok(apps
                        .into_iter()
                        .filter(|a| filter.status.is_none_or(|s| a.status == s))
                        .collect())
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Removes the application with its stages and follow-ups once confirmed.
    pub fn delete(&self, id: i64, confirm: &mut dyn Confirm) -> Result<Deletion> {
        let who = self.identity()?;
        let app = self.get(id)?;
        let prompt = format!(
            "Delete application #{} ({} - {}) with all its stages and follow-ups?",
            app.id, app.company, app.job_title
        );
        if !confirm.confirm(&prompt) {
            return Ok(Deletion::Declined);
        }

        self.store.delete_application(who, id)?;
        info!(id, "application deleted");
        if let Some(cache) = self.cache {
            cache.invalidate(who, id);
        }
        Ok(Deletion::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::AssumeYes;
    use crate::db::Database;
    use crate::testing::{Decline, FlakyStore};
    use chrono::Duration;

    fn ada() -> Identity {
        Identity::new("ada").unwrap()
    }

    fn fields(company: &str, title: &str) -> NewApplication {
        NewApplication {
            company: company.to_string(),
            job_title: title.to_string(),
            ..NewApplication::default()
        }
    }

    #[test]
    fn test_create_defaults_to_saved() {
        let db = Database::open_in_memory().unwrap();
        let who = ada();
        let apps = ApplicationManager::new(&db, Some(&who));

        let app = apps.create(fields("  Acme ", "Engineer")).unwrap();
        assert_eq!(app.status, ApplicationStatus::Saved);
        assert_eq!(app.company, "Acme");
        assert_eq!(app.applied_at, None);
    }

    #[test]
    fn test_create_mark_applied_sets_applied_at_to_creation_time() {
        let db = Database::open_in_memory().unwrap();
        let who = ada();
        let apps = ApplicationManager::new(&db, Some(&who));

        let mut new = fields("Acme", "Engineer");
        new.mark_applied = true;
        let app = apps.create(new).unwrap();
        assert_eq!(app.status, ApplicationStatus::Applied);
        assert_eq!(app.applied_at, Some(app.created_at));
    }

    #[test]
    fn test_create_rejects_blank_required_fields() {
        let db = Database::open_in_memory().unwrap();
        let who = ada();
        let apps = ApplicationManager::new(&db, Some(&who));

        assert!(matches!(
            apps.create(fields("  ", "Engineer")),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            apps.create(fields("Acme", "")),
            Err(Error::Validation(_))
        ));
        assert!(apps.list(ApplicationFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_create_validates_url() {
        let db = Database::open_in_memory().unwrap();
        let who = ada();
        let apps = ApplicationManager::new(&db, Some(&who));

        let mut bad = fields("Acme", "Engineer");
        bad.url = Some("acme.com/jobs/1".into());
        assert!(matches!(apps.create(bad), Err(Error::Validation(_))));

        let mut good = fields("Acme", "Engineer");
        good.url = Some("https://acme.com/jobs/1".into());
        assert_eq!(
            apps.create(good).unwrap().url.as_deref(),
            Some("https://acme.com/jobs/1")
        );
    }

    #[test]
    fn test_document_ids_are_not_checked() {
        let db = Database::open_in_memory().unwrap();
        let who = ada();
        let apps = ApplicationManager::new(&db, Some(&who));

        let mut new = fields("Acme", "Engineer");
        new.resume_id = Some(99);
        let app = apps.create(new).unwrap();
        assert_eq!(app.resume_id, Some(99));
        assert!(db.get_document(&who, 99).unwrap().is_none());
    }

    #[test]
    fn test_validate_url_rejects_malformed_and_non_http() {
        for bad in [
            "acme.com/jobs/1",
            "https://example.com:abc/jobs",
            "https://exa%zz.com",
            "ftp://acme.com/jobs",
            "mailto:jobs@acme.com",
        ] {
            assert!(
                matches!(validate_url(Some(bad.into())), Err(Error::Validation(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_validate_url_accepts_ports_and_ip_literals() {
        for good in [
            "http://[::1]:8080/jobs",
            "http://localhost:3000/jobs/7",
            "https://careers.acme.com/jobs?id=7#apply",
            "http://127.0.0.1/jobs",
        ] {
            assert_eq!(validate_url(Some(good.into())).unwrap().as_deref(), Some(good));
        }
        assert_eq!(validate_url(Some("  ".into())).unwrap(), None);
        assert_eq!(validate_url(None).unwrap(), None);
    }

    #[test]
    fn test_update_merges_and_refreshes_updated_at() {
        let db = Database::open_in_memory().unwrap();
        let who = ada();
        let apps = ApplicationManager::new(&db, Some(&who));
        let created = apps.create(fields("Acme", "Engineer")).unwrap();

        let patch = ApplicationPatch {
            notes: Some(Some("Referred by Grace".into())),
            status: Some(ApplicationStatus::Interview),
            ..ApplicationPatch::default()
        };
        let updated = apps.update(created.id, patch).unwrap();
        assert_eq!(updated.company, "Acme");
        assert_eq!(updated.status, ApplicationStatus::Interview);
        assert_eq!(updated.notes.as_deref(), Some("Referred by Grace"));
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test]
    fn test_update_rechecks_included_required_fields() {
        let db = Database::open_in_memory().unwrap();
        let who = ada();
        let apps = ApplicationManager::new(&db, Some(&who));
        let created = apps.create(fields("Acme", "Engineer")).unwrap();

        let patch = ApplicationPatch {
            job_title: Some(" ".into()),
            ..ApplicationPatch::default()
        };
        assert!(matches!(
            apps.update(created.id, patch),
            Err(Error::Validation(_))
        ));
        assert_eq!(apps.get(created.id).unwrap().job_title, "Engineer");
    }

    #[test]
    fn test_any_status_can_follow_any_other() {
        let db = Database::open_in_memory().unwrap();
        let who = ada();
        let apps = ApplicationManager::new(&db, Some(&who));
        let id = apps.create(fields("Acme", "Engineer")).unwrap().id;

        for from in ApplicationStatus::ALL {
            for to in ApplicationStatus::ALL {
                apps.set_status(id, from).unwrap();
                assert_eq!(apps.set_status(id, to).unwrap().status, to);
            }
        }
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let who = ada();
        let apps = ApplicationManager::new(&db, Some(&who));
        assert!(matches!(
            apps.get(42),
            Err(Error::NotFound { kind: "Application", id: 42 })
        ));
        assert!(matches!(
            apps.update(42, ApplicationPatch::status(ApplicationStatus::Offer)),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_signed_out_reads_are_empty_and_writes_refused() {
        let db = Database::open_in_memory().unwrap();
        let apps = ApplicationManager::new(&db, None);
        assert!(apps.list(ApplicationFilter::default()).unwrap().is_empty());
        assert!(apps.find(1).unwrap().is_none());
        assert!(matches!(
            apps.create(fields("Acme", "Engineer")),
            Err(Error::SignedOut)
        ));
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let db = Database::open_in_memory().unwrap();
        let who = ada();
        let apps = ApplicationManager::new(&db, Some(&who));
        let id = apps.create(fields("Acme", "Engineer")).unwrap().id;

        assert_eq!(apps.delete(id, &mut Decline).unwrap(), Deletion::Declined);
        assert!(apps.find(id).unwrap().is_some());

        assert_eq!(apps.delete(id, &mut AssumeYes).unwrap(), Deletion::Deleted);
        assert!(apps.find(id).unwrap().is_none());
    }

    #[test]
    fn test_transient_read_falls_back_to_cache() {
        let store = FlakyStore::new();
        let who = ada();
        let cache = ReadCache::in_memory(Duration::hours(1));
        let apps = ApplicationManager::new(&store, Some(&who)).with_cache(&cache);

        let created = apps.create(fields("Acme", "Engineer")).unwrap();
        apps.create(fields("Globex", "SRE")).unwrap();
        assert_eq!(apps.list(ApplicationFilter::default()).unwrap().len(), 2);

        store.go_offline();
        assert_eq!(apps.get(created.id).unwrap().company, "Acme");
        let listed = apps.list(ApplicationFilter::default()).unwrap();
        assert_eq!(listed.len(), 2);
        let saved_only = apps
            .list(ApplicationFilter {
                status: Some(ApplicationStatus::Applied),
            })
            .unwrap();
        assert!(saved_only.is_empty());
    }

    #[test]
    fn test_transient_read_without_cache_entry_fails() {
        let store = FlakyStore::new();
        let who = ada();
        let cache = ReadCache::in_memory(Duration::hours(1));
        let apps = ApplicationManager::new(&store, Some(&who)).with_cache(&cache);

        store.go_offline();
        assert!(matches!(apps.get(1), Err(Error::Unavailable(_))));
        assert!(matches!(
            apps.list(ApplicationFilter::default()),
            Err(Error::Unavailable(_))
        ));
    }

    #[test]
    fn test_failed_write_is_not_reflected_in_cache() {
        let store = FlakyStore::new();
        let who = ada();
        let cache = ReadCache::in_memory(Duration::hours(1));
        let apps = ApplicationManager::new(&store, Some(&who)).with_cache(&cache);
        let id = apps.create(fields("Acme", "Engineer")).unwrap().id;

        store.go_offline();
        assert!(apps.set_status(id, ApplicationStatus::Offer).is_err());
        assert_eq!(apps.get(id).unwrap().status, ApplicationStatus::Saved);
    }
}
