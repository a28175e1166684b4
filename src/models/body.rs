//! Normalized rich text for message bodies.
//!
//! Bodies are stored structurally so the cache, the reader front-end and the
//! book assembler never have to deal with site markup.

use serde::{Deserialize, Serialize};

/// A block-level element of a message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph { content: Vec<Inline> },
    Heading { level: u8, content: Vec<Inline> },
    Quote { blocks: Vec<Block> },
    List { ordered: bool, items: Vec<Vec<Block>> },
    Preformatted { text: String },
    Image { src: String, alt: String },
    Rule,
}

/// An inline element of a message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inline {
    Text { text: String },
    Emphasis { content: Vec<Inline> },
    Strong { content: Vec<Inline> },
    Strikethrough { content: Vec<Inline> },
    Underline { content: Vec<Inline> },
    Code { text: String },
    Link { href: String, content: Vec<Inline> },
    Image { src: String, alt: String },
    LineBreak,
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text { text: text.into() }
    }
}
