//! Read-through cache of application reads. Only consulted when the store is
//! unavailable, and only for entries younger than the configured TTL.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{Application, Identity};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry<T> {
    value: T,
    stored_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserCache {
    applications: HashMap<i64, Entry<Application>>,
    /// Full unfiltered listing, newest-updated first.
    listing: Option<Entry<Vec<i64>>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    users: HashMap<String, UserCache>,
}

pub struct ReadCache {
    ttl: Duration,
    path: Option<PathBuf>,
    inner: RefCell<CacheFile>,
}

impl ReadCache {
    pub fn in_memory(ttl: Duration) -> Self {
        Self {
            ttl,
            path: None,
            inner: RefCell::new(CacheFile::default()),
        }
    }

    /// Loads the cache file if present. A missing or unreadable file starts
    /// an empty cache.
    pub fn load(path: &Path, ttl: Duration) -> Self {
        let inner = match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<CacheFile>(&text) {
                Ok(file) => file,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "discarding corrupt cache file");
                    CacheFile::default()
                }
            },
            Err(_) => CacheFile::default(),
        };
        Self {
            ttl,
            path: Some(path.to_path_buf()),
            inner: RefCell::new(inner),
        }
    }

    pub fn default_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "apptrack") {
            proj_dirs.cache_dir().join("applications.json")
        } else {
            PathBuf::from("apptrack-cache.json")
        }
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.evict_expired(Utc::now());
        let text = serde_json::to_string(&*self.inner.borrow())?;
        std::fs::write(path, text)?;
        debug!(path = %path.display(), "cache saved");
        Ok(())
    }

    fn fresh(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - stored_at <= self.ttl
    }

    pub fn put(&self, who: &Identity, app: &Application) {
        self.put_at(who, app, Utc::now());
    }

    fn put_at(&self, who: &Identity, app: &Application, now: DateTime<Utc>) {
        let mut inner = self.inner.borrow_mut();
        let user = inner.users.entry(who.as_str().to_string()).or_default();
        user.applications.insert(
            app.id,
            Entry {
                value: app.clone(),
                stored_at: now,
            },
        );
    }

    /// Records a complete listing and every application in it.
    pub fn put_listing(&self, who: &Identity, apps: &[Application]) {
        self.put_listing_at(who, apps, Utc::now());
    }

    fn put_listing_at(&self, who: &Identity, apps: &[Application], now: DateTime<Utc>) {
        for app in apps {
            self.put_at(who, app, now);
        }
        let mut inner = self.inner.borrow_mut();
        let user = inner.users.entry(who.as_str().to_string()).or_default();
        user.listing = Some(Entry {
            value: apps.iter().map(|a| a.id).collect(),
            stored_at: now,
        });
    }

    pub fn get(&self, who: &Identity, id: i64) -> Option<Application> {
        self.get_at(who, id, Utc::now())
    }

    fn get_at(&self, who: &Identity, id: i64, now: DateTime<Utc>) -> Option<Application> {
        let inner = self.inner.borrow();
        let entry = inner.users.get(who.as_str())?.applications.get(&id)?;
        self.fresh(entry.stored_at, now).then(|| entry.value.clone())
    }

    /// The last complete listing, with single-record refreshes applied.
    pub fn listing(&self, who: &Identity) -> Option<Vec<Application>> {
        self.listing_at(who, Utc::now())
    }

    fn listing_at(&self, who: &Identity, now: DateTime<Utc>) -> Option<Vec<Application>> {
        let inner = self.inner.borrow();
        let user = inner.users.get(who.as_str())?;
        let listing = user.listing.as_ref()?;
        if !self.fresh(listing.stored_at, now) {
            return None;
        }
        Some(
            listing
                .value
                .iter()
                .filter_map(|id| user.applications.get(id))
                .map(|entry| entry.value.clone())
                .collect(),
        )
    }

    /// Drops a record and any listing that contained it.
    pub fn invalidate(&self, who: &Identity, id: i64) {
        let mut inner = self.inner.borrow_mut();
        if let Some(user) = inner.users.get_mut(who.as_str()) {
            user.applications.remove(&id);
            user.listing = None;
        }
    }

    /// New records make the cached listing incomplete.
    pub fn invalidate_listing(&self, who: &Identity) {
        let mut inner = self.inner.borrow_mut();
        if let Some(user) = inner.users.get_mut(who.as_str()) {
            user.listing = None;
        }
    }

    fn evict_expired(&self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        let mut inner = self.inner.borrow_mut();
        for user in inner.users.values_mut() {
            user.applications.retain(|_, e| now - e.stored_at <= ttl);
            if user
                .listing
                .as_ref()
                .is_some_and(|l| now - l.stored_at > ttl)
            {
                user.listing = None;
            }
        }
        inner
            .users
            .retain(|_, u| !u.applications.is_empty() || u.listing.is_some());
    }
}
