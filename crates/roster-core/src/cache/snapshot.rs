use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::Page;

/// Storage key of the persisted first page.
pub const SNAPSHOT_KEY: &str = "users_data";

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to access snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to parse snapshot: {0}")]
    Decode(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }

    pub fn is_older_than(&self, max_age: Duration) -> bool {
        Utc::now() - self.cached_at > max_age
    }
}

/// Durable home of the persisted page one.
///
/// Writes overwrite the single entry. Reads never fail from the caller's
/// point of view: a missing, unreadable, unparsable or expired entry is a
/// miss.
pub trait SnapshotStore: Send + Sync {
    /// Raw read of the stored entry, with errors.
    fn read(&self) -> Result<Option<CachedData<Page>>, PersistenceError>;

    fn save(&self, page: &Page) -> Result<(), PersistenceError>;

    fn clear(&self) -> Result<(), PersistenceError>;

    /// Entries older than this are ignored by `load`.
    fn max_age(&self) -> Option<Duration> {
        None
    }

    fn load(&self) -> Option<Page> {
        match self.read() {
            Ok(Some(cached)) => match self.max_age() {
                Some(max_age) if cached.is_older_than(max_age) => {
                    debug!(age = %cached.age_display(), "Persisted snapshot expired");
                    None
                }
                _ => Some(cached.data),
            },
            Ok(None) => None,
            Err(e) => {
                debug!(error = %e, "Failed to load persisted snapshot, treating as miss");
                None
            }
        }
    }
}

/// Snapshot kept as a JSON file in the cache directory.
pub struct FileSnapshotStore {
    path: PathBuf,
    max_age: Option<Duration>,
}

impl FileSnapshotStore {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            path: cache_dir.join(format!("{}.json", SNAPSHOT_KEY)),
            max_age: None,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn read(&self) -> Result<Option<CachedData<Page>>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let cached = serde_json::from_str(&contents).map_err(PersistenceError::Decode)?;
        Ok(Some(cached))
    }

    fn save(&self, page: &Page) -> Result<(), PersistenceError> {
        let contents =
            serde_json::to_string_pretty(&CachedData::new(page)).map_err(PersistenceError::Encode)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        std::fs::write(&self.path, contents).map_err(|e| self.io_error(e))
    }

    fn clear(&self) -> Result<(), PersistenceError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn max_age(&self) -> Option<Duration> {
        self.max_age
    }
}

/// In-process snapshot, stored serialized so it behaves like the file store.
#[derive(Default)]
pub struct MemorySnapshotStore {
    raw: Mutex<Option<String>>,
    max_age: Option<Duration>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Replace the stored entry with arbitrary text.
    pub fn put_raw(&self, raw: impl Into<String>) {
        *self.raw.lock() = Some(raw.into());
    }

    pub fn is_empty(&self) -> bool {
        self.raw.lock().is_none()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn read(&self) -> Result<Option<CachedData<Page>>, PersistenceError> {
        match self.raw.lock().as_deref() {
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .map_err(PersistenceError::Decode),
            None => Ok(None),
        }
    }

    fn save(&self, page: &Page) -> Result<(), PersistenceError> {
        let raw = serde_json::to_string(&CachedData::new(page)).map_err(PersistenceError::Encode)?;
        *self.raw.lock() = Some(raw);
        Ok(())
    }

    fn clear(&self) -> Result<(), PersistenceError> {
        *self.raw.lock() = None;
        Ok(())
    }

    fn max_age(&self) -> Option<Duration> {
        self.max_age
    }
}

// ============================================================================
// Tests
// ============================================================================
