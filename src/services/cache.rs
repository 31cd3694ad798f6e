//! File-backed response cache with mtime-based expiry.
//!
//! Every cached response is one file named `{domain}.{key}` in the cache
//! directory. The file's modification time is the only freshness timestamp:
//! an entry is fresh while `mtime + max_age > now`.
//!
//! Writes are best-effort. A failed write is logged and swallowed, since
//! callers always have the live response in hand.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

/// Cache collaborator used by the fetcher.
///
/// `max_age = None` means "use the cache's configured default".
pub trait ResponseCache: Send + Sync + fmt::Debug {
    /// Whether a fresh entry exists for `key`.
    fn is_cached(&self, key: &str, max_age: Option<Duration>) -> bool;

    /// Fresh payload for `key`, or `None` on miss or stale entry.
    fn read(&self, key: &str, max_age: Option<Duration>) -> Option<String>;

    /// Payload for `key` regardless of age.
    fn read_stale(&self, key: &str) -> Option<String>;

    /// Store `payload` under `key`. Never fails from the caller's point of view.
    fn write(&self, key: &str, payload: &str);

    /// Delete entries older than `max_age`. Returns the number removed.
    fn purge(&self, max_age: Option<Duration>) -> usize;
}

/// Age of an entry given its mtime. Entries stamped in the future count as new.
fn age_of(mtime: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(mtime).unwrap_or(Duration::ZERO)
}

/// Cache stored as plain files in one directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
    default_max_age: Duration,
    domain: Option<String>,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>, default_max_age: Duration, domain: Option<&str>) -> Self {
        let dir = dir.into();
        tracing::debug!("Initializing cache in {}", dir.display());
        Self {
            dir,
            default_max_age,
            domain: domain.filter(|d| !d.is_empty()).map(str::to_string),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn file_path(&self, key: &str) -> PathBuf {
        match &self.domain {
            Some(domain) => self.dir.join(format!("{}.{}", domain, key)),
            None => self.dir.join(key),
        }
    }

    /// How long ago the entry for `key` was stored, if it exists.
    pub fn cached_for(&self, key: &str) -> Option<Duration> {
        let meta = fs::metadata(self.file_path(key)).ok()?;
        if !meta.is_file() {
            return None;
        }
        let mtime = meta.modified().ok()?;
        Some(age_of(mtime, SystemTime::now()))
    }

    fn owns(&self, file_name: &str) -> bool {
        match &self.domain {
            Some(domain) => file_name
                .strip_prefix(domain.as_str())
                .is_some_and(|rest| rest.starts_with('.')),
            None => true,
        }
    }
}

impl ResponseCache for FileCache {
    fn is_cached(&self, key: &str, max_age: Option<Duration>) -> bool {
        let max_age = max_age.unwrap_or(self.default_max_age);
        self.cached_for(key).is_some_and(|age| age < max_age)
    }

    fn read(&self, key: &str, max_age: Option<Duration>) -> Option<String> {
        let path = self.file_path(key);
        tracing::debug!("Read cache file {}", path.display());
        if !self.is_cached(key, max_age) {
            return None;
        }
        fs::read_to_string(&path).ok()
    }

    fn read_stale(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.file_path(key)).ok()
    }

    fn write(&self, key: &str, payload: &str) {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            tracing::warn!("Can't create cache dir {}: {}", self.dir.display(), e);
            return;
        }
        let path = self.file_path(key);
        tracing::debug!("Store cache file {}", path.display());
        if let Err(e) = fs::write(&path, payload) {
            tracing::warn!("Can't write cache file {}: {}", path.display(), e);
        }
    }

    fn purge(&self, max_age: Option<Duration>) -> usize {
        let max_age = max_age.unwrap_or(self.default_max_age);
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };
        tracing::debug!("Cleaning cache directory {}", self.dir.display());

        let now = SystemTime::now();
        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            if !self.owns(&name.to_string_lossy()) {
                continue;
            }
            let Ok(meta) = entry.metadata() else { continue };
            if !meta.is_file() {
                continue;
            }
            let Ok(mtime) = meta.modified() else { continue };
            if age_of(mtime, now) >= max_age && fs::remove_file(entry.path()).is_ok() {
                removed += 1;
            }
        }
        removed
    }
}

/// In-process cache with the same freshness rules as [`FileCache`].
#[derive(Debug, Default)]
pub struct MemoryCache {
    default_max_age: Duration,
    entries: Mutex<HashMap<String, (String, SystemTime)>>,
}

impl MemoryCache {
    pub fn new(default_max_age: Duration) -> Self {
        Self {
            default_max_age,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store an entry with an explicit timestamp.
    pub fn insert_with_mtime(&self, key: &str, payload: &str, mtime: SystemTime) {
        self.lock().insert(key.to_string(), (payload.to_string(), mtime));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (String, SystemTime)>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ResponseCache for MemoryCache {
    fn is_cached(&self, key: &str, max_age: Option<Duration>) -> bool {
        self.read(key, max_age).is_some()
    }

    fn read(&self, key: &str, max_age: Option<Duration>) -> Option<String> {
        let max_age = max_age.unwrap_or(self.default_max_age);
        let now = SystemTime::now();
        self.lock()
            .get(key)
            .filter(|(_, mtime)| age_of(*mtime, now) < max_age)
            .map(|(payload, _)| payload.clone())
    }

    fn read_stale(&self, key: &str) -> Option<String> {
        self.lock().get(key).map(|(payload, _)| payload.clone())
    }

    fn write(&self, key: &str, payload: &str) {
        self.insert_with_mtime(key, payload, SystemTime::now());
    }

    fn purge(&self, max_age: Option<Duration>) -> usize {
        let max_age = max_age.unwrap_or(self.default_max_age);
        let now = SystemTime::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, (_, mtime)| age_of(*mtime, now) < max_age);
        before - entries.len()
    }
}
