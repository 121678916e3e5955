//! Durable string key/value storage shared by the sequencer and the screens.
//!
//! [`KeyValueStore`] is the seam between the wizard and whatever persists its
//! progress on the device. [`FileStore`] keeps everything in one JSON object on
//! disk; [`MemoryStore`] is the in-process variant for embedding and tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

/// Failure of the underlying durable store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("read store {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse store {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialize store {path}: {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("write store {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("store backend failed for key `{key}`: {message}")]
    Backend { key: String, message: String },
}

/// Async, string-keyed, string-valued durable store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process store. Contents are lost with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry, sorted by key.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk.
///
/// Every mutation rewrites the whole file atomically (temp file + rename), so a
/// crash leaves either the old or the new contents. Operations are serialized
/// through an async lock to keep read-modify-write cycles intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.display().to_string(),
                    source,
                });
            }
        };
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Load entries for a read-modify-write cycle. A corrupt file is
    /// replaced rather than blocking every later write; the flag reports it.
    async fn load_for_write(&self) -> Result<(BTreeMap<String, String>, bool), StoreError> {
        match self.load().await {
            Ok(entries) => Ok((entries, false)),
            Err(StoreError::Parse { path, source }) => {
                warn!(path = %path, error = %source, "discarding unreadable store contents");
                Ok((BTreeMap::new(), true))
            }
            Err(err) => Err(err),
        }
    }

    async fn write(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let display = self.path.display().to_string();
        let mut buf =
            serde_json::to_string_pretty(entries).map_err(|source| StoreError::Serialize {
                path: display.clone(),
                source,
            })?;
        buf.push('\n');
        write_atomic(&self.path, &buf)
            .await
            .map_err(|source| StoreError::Write {
                path: display,
                source,
            })
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        Ok(entries.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let (mut entries, _) = self.load_for_write().await?;
        entries.insert(key.to_string(), value.to_string());
        debug!(path = %self.path.display(), key, value, "writing store entry");
        self.write(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let (mut entries, discarded) = self.load_for_write().await?;
        if entries.remove(key).is_none() && !discarded {
            return Ok(());
        }
        debug!(path = %self.path.display(), key, "removing store entry");
        self.write(&entries).await
    }
}

async fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("store path has no parent"))?;
    fs::create_dir_all(parent).await?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents).await?;
    fs::rename(&tmp_path, path).await
}
