//! Local filesystem cache implementation.
//!
//! Writes go to a temporary file that is renamed into place, so a reader
//! never sees a half-written entry. Writes for the same post are serialized
//! by a per-post lock; different posts never contend.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{Post, PostId};
use crate::storage::{CacheEntry, PostCache, PutOutcome};

const POSTS_DIR: &str = "posts";

/// Local filesystem cache backend.
pub struct LocalCache {
    root_dir: PathBuf,
    locks: Mutex<HashMap<PostId, Arc<Mutex<()>>>>,
}

impl LocalCache {
    /// Create a new LocalCache rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Path of the entry for a post.
    pub fn entry_path(&self, id: PostId) -> PathBuf {
        self.root_dir.join(POSTS_DIR).join(format!("{id}.json"))
    }

    async fn lock_for(&self, id: PostId) -> Arc<Mutex<()>> {
        self.locks.lock().await.entry(id).or_default().clone()
    }

    /// Drop the per-post lock once no other writer holds a handle to it.
    async fn release_lock(&self, id: PostId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        drop(lock);
        if locks.get(&id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(&id);
        }
    }

    async fn store(&self, post: &Post, listed_at: Option<NaiveDateTime>) -> Result<PutOutcome> {
        let path = self.entry_path(post.id);
        let previous: Option<CacheEntry> = match self.read_json(&path).await {
            Ok(previous) => previous,
            Err(e) => {
                log::warn!("Replacing unreadable cache entry for post {}: {e}", post.id);
                None
            }
        };

        let outcome = match &previous {
            Some(entry) if entry.fingerprint == post.fingerprint => {
                if listed_at.is_none() || entry.listed_at >= listed_at {
                    log::debug!("Post {} unchanged in cache", post.id);
                    return Ok(PutOutcome::Unchanged);
                }
                // Same content under a newer listing stamp; record the stamp.
                PutOutcome::Unchanged
            }
            Some(_) => PutOutcome::Replaced,
            None => PutOutcome::Stored,
        };

        self.write_json(&path, &CacheEntry::new(post.clone(), listed_at))
            .await?;
        log::debug!("Post {} cached ({outcome:?})", post.id);
        Ok(outcome)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(path, &bytes).await
    }

    /// Read JSON data, returning None if the file doesn't exist.
    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl PostCache for LocalCache {
    async fn get(&self, id: PostId) -> Result<Option<CacheEntry>> {
        self.read_json(&self.entry_path(id)).await
    }

    async fn put(&self, post: &Post, listed_at: Option<NaiveDateTime>) -> Result<PutOutcome> {
        let lock = self.lock_for(post.id).await;
        let result = {
            let _guard = lock.lock().await;
            self.store(post, listed_at).await
        };
        self.release_lock(post.id, lock).await;
        result
    }

    async fn ids(&self) -> Result<Vec<PostId>> {
        let dir = self.root_dir.join(POSTS_DIR);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(id) = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| stem.parse().ok())
                {
                    ids.push(id);
                }
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }
}
