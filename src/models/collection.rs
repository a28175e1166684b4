//! Input targets and resolved collections.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::post::PostId;

/// What an input URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Target {
    Post(PostId),
    Section(u64),
    Board(u64),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Post(id) => write!(f, "post {id}"),
            Target::Section(id) => write!(f, "section {id}"),
            Target::Board(id) => write!(f, "board {id}"),
        }
    }
}

/// Collection kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Section,
    Board,
}

/// A post as listed on a section or board page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionItem {
    pub post_id: PostId,

    /// Subject shown in the listing
    #[serde(default)]
    pub title: String,

    /// Last-updated time shown in the listing, in site-local time
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,

    /// Board section the post was listed under
    #[serde(default)]
    pub section_id: Option<u64>,
}

/// A section boundary inside a flattened board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSpan {
    pub id: u64,
    pub title: String,
    /// Index of the first post of this section in `Collection::items`
    pub start: usize,
    pub len: usize,
}

/// An ordered, duplicate-free list of posts from a board section or board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: u64,
    pub kind: CollectionKind,
    pub title: String,
    pub items: Vec<CollectionItem>,
    #[serde(default)]
    pub sections: Vec<SectionSpan>,
}

impl Collection {
    pub fn new(id: u64, kind: CollectionKind, title: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            title: title.into(),
            items: Vec::new(),
            sections: Vec::new(),
        }
    }

    /// Post identifiers in display order.
    pub fn post_ids(&self) -> Vec<PostId> {
        self.items.iter().map(|item| item.post_id).collect()
    }

    /// Append items, skipping posts already present. Returns how many were added.
    pub fn extend_unique(&mut self, items: impl IntoIterator<Item = CollectionItem>) -> usize {
        let mut seen: HashSet<PostId> = self.items.iter().map(|i| i.post_id).collect();
        let before = self.items.len();
        for item in items {
            if seen.insert(item.post_id) {
                self.items.push(item);
            } else {
                log::debug!("Skipping duplicate post {} in {}", item.post_id, self.id);
            }
        }
        self.items.len() - before
    }
}
