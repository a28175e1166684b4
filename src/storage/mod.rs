//! Durable cache of fetched posts.
//!
//! ## Directory Structure
//!
//! ```text
//! {cache_dir}/
//! └── posts/
//!     ├── 5111.json
//!     └── 5112.json
//! ```
//!
//! Each file is one [`CacheEntry`]. Readers ignore fields they do not know,
//! so entries written by a newer version stay readable.

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Post, PostId};

// Re-export for convenience
pub use local::LocalCache;

/// One cached post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub post_id: PostId,
    pub fingerprint: String,
    /// When the post was fetched
    pub fetched_at: DateTime<Utc>,
    /// Listing "last updated" stamp seen when the post was fetched
    #[serde(default)]
    pub listed_at: Option<NaiveDateTime>,
    pub post: Post,
}

impl CacheEntry {
    pub fn new(post: Post, listed_at: Option<NaiveDateTime>) -> Self {
        Self {
            post_id: post.id,
            fingerprint: post.fingerprint.clone(),
            fetched_at: Utc::now(),
            listed_at,
            post,
        }
    }

    /// Whether a listing stamp says the post changed after this entry was made.
    pub fn is_stale(&self, listed_at: Option<NaiveDateTime>) -> bool {
        match (self.listed_at, listed_at) {
            (Some(cached), Some(listed)) => listed > cached,
            (None, Some(_)) => true,
            (_, None) => false,
        }
    }
}

/// Result of a cache write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// No entry existed for the post
    Stored,
    /// Same fingerprint already stored; nothing written
    Unchanged,
    /// Previous entry had a different fingerprint and was overwritten
    Replaced,
}

/// Trait for post cache backends.
#[async_trait]
pub trait PostCache: Send + Sync {
    /// Cached entry for a post. Never touches the network.
    async fn get(&self, id: PostId) -> Result<Option<CacheEntry>>;

    /// Store a post keyed by id and fingerprint.
    ///
    /// Storing an identical id and fingerprint again is a no-op; a new
    /// fingerprint overwrites the previous entry.
    async fn put(&self, post: &Post, listed_at: Option<NaiveDateTime>) -> Result<PutOutcome>;

    /// Ids of every cached post, ascending.
    async fn ids(&self) -> Result<Vec<PostId>>;
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn entry(listed_at: Option<NaiveDateTime>) -> CacheEntry {
        let post = Post {
            id: 1,
            title: "T".to_string(),
            authors: Vec::new(),
            sections: Vec::new(),
            page_count: 1,
            fingerprint: "ab".to_string(),
            url: String::new(),
        };
        CacheEntry::new(post, listed_at)
    }

    #[test]
    fn staleness_follows_listing_stamp() {
        assert!(entry(Some(at(3))).is_stale(Some(at(4))));
        assert!(!entry(Some(at(3))).is_stale(Some(at(3))));
        assert!(!entry(Some(at(3))).is_stale(None));
        assert!(entry(None).is_stale(Some(at(3))));
        assert!(!entry(None).is_stale(None));
    }
}
