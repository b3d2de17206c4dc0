//! Pluggable storage for the session token, shared between client instances
//! (and, with [`FileTokenCache`], between processes and across restarts).
//!
//! The ttl handed to [`TokenCache::set`] is only an eviction hint; readers
//! must still check the record's own expiry.

use std::collections::HashMap;
use std::fmt::Debug;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fs2::FileExt;
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::clock::{Clock, SystemClock};
use crate::models::TokenRecord;

/// The single key the session stores its token under.
pub const TOKEN_CACHE_KEY: &str = "token";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("refusing to cache token {accessor:?}: it expired at {expired_at}")]
    Expired { accessor: String, expired_at: u64 },

    #[error("token cache backend error: {0}")]
    Backend(String),

    #[error("token cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("token cache encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[async_trait]
pub trait TokenCache: Debug + Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<TokenRecord>, CacheError>;

    async fn set(&self, key: &str, record: &TokenRecord, ttl: Option<Duration>) -> Result<(), CacheError>;
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryTokenCache {
    entries: RwLock<HashMap<String, (TokenRecord, Option<Instant>)>>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenCache for MemoryTokenCache {
    async fn get(&self, key: &str) -> Result<Option<TokenRecord>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).and_then(|(record, deadline)| match deadline {
            Some(deadline) if Instant::now() >= *deadline => None,
            _ => Some(record.clone()),
        }))
    }

    async fn set(&self, key: &str, record: &TokenRecord, ttl: Option<Duration>) -> Result<(), CacheError> {
        let deadline = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .write()
            .await
            .insert(key.to_string(), (record.clone(), deadline));
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedEntry {
    record: TokenRecord,
    /// Unix seconds.
    expires_at: Option<u64>,
}

type Entries = HashMap<String, CachedEntry>;

/// Keeps entries in a JSON document on disk, shared by every instance and
/// process pointing at the same path.
///
/// Three files are involved: the document itself, a `.tmp` sibling that each
/// write goes through before being renamed over the document, and a `.lock`
/// sibling. Readers take a shared lock and writers an exclusive one on the
/// lock file; the document itself is never locked because it gets replaced.
#[derive(Debug, Clone)]
pub struct FileTokenCache {
    path: PathBuf,
    temp_path: PathBuf,
    lock_path: PathBuf,
}

impl FileTokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            temp_path: with_suffix(&path, ".tmp"),
            lock_path: with_suffix(&path, ".lock"),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn open_lock_file(lock_path: &Path) -> Result<File, CacheError> {
    Ok(OpenOptions::new().read(true).write(true).create(true).open(lock_path)?)
}

fn load(path: &Path) -> Result<Entries, CacheError> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
        Err(err) => Err(err.into()),
    }
}

/// Writes `entries` to `temp_path` (owner read/write only) and renames it
/// over `path`. Callers hold the exclusive lock.
fn flush(path: &Path, temp_path: &Path, entries: &Entries) -> Result<(), CacheError> {
    let data = serde_json::to_vec_pretty(entries)?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(temp_path)?;
    // `mode` only applies on creation; a leftover temp file keeps its own.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(&data)?;
    file.sync_all()?;
    std::fs::rename(temp_path, path)?;
    Ok(())
}

async fn blocking<T, F>(f: F) -> Result<T, CacheError>
where
    F: FnOnce() -> Result<T, CacheError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| CacheError::Backend(format!("token cache task failed: {}", err)))?
}

#[async_trait]
impl TokenCache for FileTokenCache {
    async fn get(&self, key: &str) -> Result<Option<TokenRecord>, CacheError> {
        let path = self.path.clone();
        let lock_path = self.lock_path.clone();
        let key = key.to_string();
        let now = SystemClock.now();

        blocking(move || {
            let lock = open_lock_file(&lock_path)?;
            FileExt::lock_shared(&lock)?;
            let entry = load(&path)?.remove(&key);
            FileExt::unlock(&lock)?;

            Ok(entry.and_then(|entry| match entry.expires_at {
                Some(expires_at) if now >= expires_at => None,
                _ => Some(entry.record),
            }))
        })
        .await
    }

    async fn set(&self, key: &str, record: &TokenRecord, ttl: Option<Duration>) -> Result<(), CacheError> {
        let path = self.path.clone();
        let temp_path = self.temp_path.clone();
        let lock_path = self.lock_path.clone();
        let key = key.to_string();
        let entry = CachedEntry {
            record: record.clone(),
            expires_at: ttl.map(|ttl| SystemClock.now().saturating_add(ttl.as_secs())),
        };

        blocking(move || {
            let lock = open_lock_file(&lock_path)?;
            FileExt::lock_exclusive(&lock)?;

            let mut entries = match load(&path) {
                Ok(entries) => entries,
                Err(CacheError::Encoding(err)) => {
                    warn!("Overwriting unreadable token cache {}: {}", path.display(), err);
                    HashMap::new()
                }
                Err(err) => return Err(err),
            };
            entries.insert(key, entry);
            flush(&path, &temp_path, &entries)?;

            FileExt::unlock(&lock)?;
            Ok(())
        })
        .await
    }
}
