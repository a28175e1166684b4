//! Post and message data structures.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::body::Block;

/// Site-assigned post identifier.
pub type PostId = u64;

/// A complete narrative thread, assembled from every page of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post identifier
    pub id: PostId,

    /// Post subject
    pub title: String,

    /// Distinct authors in order of first appearance
    #[serde(default)]
    pub authors: Vec<String>,

    /// Messages across all pages, ordered by `index`
    #[serde(default)]
    pub sections: Vec<Section>,

    /// Number of pages the post spanned when fetched
    pub page_count: u32,

    /// Hex SHA-256 over every raw page
    pub fingerprint: String,

    /// Canonical URL of the post
    #[serde(default)]
    pub url: String,
}

/// One message of a post (the opening post or a reply).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Position within the whole post, starting at 0
    pub index: usize,

    /// Character name; empty for narration without a character
    #[serde(default)]
    pub speaker: String,

    /// Character screen name
    #[serde(default)]
    pub screen_name: Option<String>,

    /// Writer of the message
    #[serde(default)]
    pub author: Option<String>,

    /// Reply id from the permalink, absent for the opening post
    #[serde(default)]
    pub reply_id: Option<u64>,

    /// Character icon shown next to the message
    #[serde(default)]
    pub icon: Option<Icon>,

    /// Normalized message body
    #[serde(default)]
    pub body: Vec<Block>,
}

/// Character icon reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    pub url: String,
    #[serde(default)]
    pub alt: String,
}

/// Incremental fingerprint over the raw pages of one post.
///
/// Each page is length-prefixed so that moving bytes across a page boundary
/// still changes the digest.
#[derive(Default)]
pub struct Fingerprinter {
    hasher: Sha256,
}

impl Fingerprinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, page: &[u8]) {
        self.hasher.update((page.len() as u64).to_le_bytes());
        self.hasher.update(page);
    }

    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// Fingerprint of a complete set of pages.
pub fn fingerprint<'a>(pages: impl IntoIterator<Item = &'a [u8]>) -> String {
    let mut fp = Fingerprinter::new();
    for page in pages {
        fp.update(page);
    }
    fp.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_tracks_page_boundaries() {
        let a = fingerprint([b"ab".as_slice(), b"c".as_slice()]);
        let b = fingerprint([b"a".as_slice(), b"bc".as_slice()]);
        let c = fingerprint([b"ab".as_slice(), b"c".as_slice()]);
        assert_ne!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn post_tolerates_unknown_fields() {
        let json = r#"{
            "id": 7, "title": "T", "page_count": 1, "fingerprint": "ff",
            "sections": [{"index": 0, "speaker": "A", "mood": "grim"}],
            "future_field": [1, 2, 3]
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.id, 7);
        assert_eq!(post.sections[0].speaker, "A");
        assert!(post.authors.is_empty());
    }
}
