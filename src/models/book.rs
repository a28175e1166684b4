//! Hand-off contract for the e-book assembler.

use serde::{Deserialize, Serialize};

use super::body::Block;
use super::post::{Icon, Post, Section};
use crate::error::Result;

/// Everything the assembler needs to build a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manuscript {
    pub title: String,
    pub chapters: Vec<Chapter>,
}

/// One post, rendered as a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub authors: Vec<String>,
    pub sections: Vec<ChapterSection>,
}

/// One message. `speaker` is the character name; screen name, author and icon
/// travel alongside for the assembler's header line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterSection {
    pub speaker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    pub body: Vec<Block>,
}

impl From<&Section> for ChapterSection {
    fn from(section: &Section) -> Self {
        Self {
            speaker: section.speaker.clone(),
            screen_name: section.screen_name.clone(),
            author: section.author.clone(),
            icon: section.icon.clone(),
            body: section.body.clone(),
        }
    }
}

impl From<&Post> for Chapter {
    fn from(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            authors: post.authors.clone(),
            sections: post.sections.iter().map(ChapterSection::from).collect(),
        }
    }
}

impl Manuscript {
    pub fn new(title: impl Into<String>, posts: &[Post]) -> Self {
        Self {
            title: title.into(),
            chapters: posts.iter().map(Chapter::from).collect(),
        }
    }

    /// Distinct authors across all chapters, in order of first appearance.
    pub fn authors(&self) -> Vec<String> {
        let mut authors: Vec<String> = Vec::new();
        for author in self.chapters.iter().flat_map(|c| &c.authors) {
            if !authors.contains(author) {
                authors.push(author.clone());
            }
        }
        authors
    }
}

/// Output formats an assembler can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookFormat {
    Json,
}

impl BookFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            BookFormat::Json => "json",
        }
    }
}

/// Turns a manuscript into the bytes of a book file.
pub trait BookAssembler {
    fn format(&self) -> BookFormat;
    fn assemble(&self, manuscript: &Manuscript) -> Result<Vec<u8>>;
}

/// Writes the manuscript itself as pretty-printed JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonAssembler;

impl BookAssembler for JsonAssembler {
    fn format(&self) -> BookFormat {
        BookFormat::Json
    }

    fn assemble(&self, manuscript: &Manuscript) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(manuscript)?)
    }
}
