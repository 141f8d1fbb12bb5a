//! Key-value backends for simulation state
//!
//! State must outlive a single process, so the engine never keeps it in its
//! own memory: every call goes through a [`KeyValueStore`]. Two backends ship
//! with the crate:
//! - [`MemoryKv`]: sharded in-process map, for tests and ephemeral servers
//! - [`FileKv`]: one JSON file per key under a directory, survives restarts

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Key-value backend errors
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// Filesystem failure
    #[error("io error on key '{key}': {source}")]
    Io {
        /// Key being accessed
        key: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Stored record is not valid JSON
    #[error("corrupt record for key '{key}': {source}")]
    Corrupt {
        /// Key being accessed
        key: String,
        /// Decode error
        #[source]
        source: serde_json::Error,
    },
}

impl KvError {
    fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            key: key.into(),
            source,
        }
    }
}

/// String-to-string store with prefix deletion
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: String) -> Result<(), KvError>;

    /// Remove a key; absent keys are not an error
    async fn delete(&self, key: &str) -> Result<(), KvError>;

    /// Remove every key starting with `prefix`, returning how many went
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, KvError>;

    /// All `(key, value)` pairs whose key starts with `prefix`, sorted by key
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, KvError>;
}

/// In-process key-value store
#[derive(Debug, Default)]
pub struct MemoryKv {
    inner: DashMap<String, String>,
}

impl MemoryKv {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.inner.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        self.inner.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.inner.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, KvError> {
        let before = self.inner.len();
        self.inner.retain(|k, _| !k.starts_with(prefix));
        Ok(before.saturating_sub(self.inner.len()))
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, KvError> {
        let mut out: Vec<_> = self
            .inner
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}

/// On-disk layout of one key
#[derive(Debug, Serialize, Deserialize)]
struct FileRecord {
    key: String,
    value: String,
}

/// Directory-backed key-value store
///
/// File names are the blake3 hash of the key, so arbitrary keys (slashes,
/// spaces, braces from path templates) map to safe names. The original key is
/// kept inside the record for prefix scans. Writes go to a temp file that is
/// renamed over the target.
#[derive(Debug, Clone)]
pub struct FileKv {
    root: PathBuf,
}

impl FileKv {
    /// Open store rooted at `root`, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, KvError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| KvError::io(root.display().to_string(), e))?;
        Ok(Self { root })
    }

    /// Storage directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_name(key: &str) -> String {
        hex::encode(blake3::hash(key.as_bytes()).as_bytes())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", Self::file_name(key)))
    }

    async fn read_record(path: &Path, key_hint: &str) -> Result<Option<FileRecord>, KvError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| KvError::Corrupt {
                    key: key_hint.to_string(),
                    source,
                }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KvError::io(key_hint, e)),
        }
    }

    /// Records under the root, paired with their paths
    async fn records(&self, prefix: &str) -> Result<Vec<(PathBuf, FileRecord)>, KvError> {
        let mut dir = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| KvError::io(prefix, e))?;
        let mut out = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| KvError::io(prefix, e))? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(record) = Self::read_record(&path, prefix).await? {
                if record.key.starts_with(prefix) {
                    out.push((path, record));
                }
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl KeyValueStore for FileKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(Self::read_record(&self.path_for(key), key)
            .await?
            .map(|record| record.value))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        let record = FileRecord {
            key: key.to_string(),
            value,
        };
        let bytes = serde_json::to_vec(&record).map_err(|source| KvError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        let target = self.path_for(key);
        let tmp = self
            .root
            .join(format!("{}.{}.tmp", Self::file_name(key), uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| KvError::io(key, e))?;
        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(|e| KvError::io(key, e))
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(KvError::io(key, e)),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, KvError> {
        let mut removed = 0;
        for (path, record) in self.records(prefix).await? {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(KvError::io(record.key, e)),
            }
        }
        Ok(removed)
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, KvError> {
        let mut out: Vec<_> = self
            .records(prefix)
            .await?
            .into_iter()
            .map(|(_, record)| (record.key, record.value))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}
