// src/services/normalize.rs

//! Conversion of message markup into [`Block`]s.
//!
//! Whitespace is collapsed the way a browser would render it, unknown tags are
//! unwrapped and relative links are resolved against the site root.

use std::mem;

use scraper::ElementRef;
use url::Url;

use crate::models::{Block, Inline};
use crate::utils::resolve_url;

/// Elements whose children are laid out as separate blocks.
const CONTAINERS: &[&str] = &[
    "div", "section", "article", "aside", "center", "figure", "figcaption", "header",
    "footer", "main", "details", "summary", "table", "thead", "tbody", "tfoot", "tr", "td",
    "th", "dl", "dt", "dd", "li", "body", "html",
];

/// Elements that start a block of their own.
const BLOCKS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "ul", "ol", "pre", "hr",
];

/// Elements never rendered.
const SKIPPED: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Converts message markup to the normalized document model.
pub struct Normalizer<'a> {
    base: &'a Url,
}

impl<'a> Normalizer<'a> {
    pub fn new(base: &'a Url) -> Self {
        Self { base }
    }

    /// Blocks for the children of `element`.
    pub fn blocks(&self, element: ElementRef<'_>) -> Vec<Block> {
        let mut out = BlockBuilder::default();
        self.push_children(element, &mut out);
        out.finish()
    }

    fn push_children(&self, element: ElementRef<'_>, out: &mut BlockBuilder) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                out.pending.push(Inline::text(&**text));
            } else if let Some(child) = ElementRef::wrap(child) {
                self.push_block_element(child, out);
            }
        }
    }

    fn push_block_element(&self, element: ElementRef<'_>, out: &mut BlockBuilder) {
        let name = element.value().name();
        match name {
            "p" => {
                out.flush();
                out.paragraph(self.inlines(element));
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse().unwrap_or(1);
                let content = collapse(self.inlines(element));
                if !content.is_empty() {
                    out.block(Block::Heading { level, content });
                }
            }
            "blockquote" => {
                let blocks = self.blocks(element);
                if !blocks.is_empty() {
                    out.block(Block::Quote { blocks });
                }
            }
            "ul" | "ol" => {
                let items: Vec<Vec<Block>> = element
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|child| child.value().name() == "li")
                    .map(|li| self.blocks(li))
                    .collect();
                if !items.is_empty() {
                    out.block(Block::List {
                        ordered: name == "ol",
                        items,
                    });
                }
            }
            "pre" => out.block(Block::Preformatted {
                text: element.text().collect(),
            }),
            "hr" => out.block(Block::Rule),
            _ if SKIPPED.contains(&name) => {}
            _ if CONTAINERS.contains(&name) => {
                out.flush();
                self.push_children(element, out);
                out.flush();
            }
            // Editors wrap whole paragraphs in spans and fonts; keep those blocks apart.
            _ if contains_block(element) => self.push_children(element, out),
            _ => self.push_inline_element(element, &mut out.pending),
        }
    }

    /// Inline content of `element`, whitespace not yet collapsed.
    fn inlines(&self, element: ElementRef<'_>) -> Vec<Inline> {
        let mut out = Vec::new();
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                out.push(Inline::text(&**text));
            } else if let Some(child) = ElementRef::wrap(child) {
                self.push_inline_element(child, &mut out);
            }
        }
        out
    }

    fn push_inline_element(&self, element: ElementRef<'_>, out: &mut Vec<Inline>) {
        let el = element.value();
        match el.name() {
            "em" | "i" | "cite" | "dfn" | "var" => out.push(Inline::Emphasis {
                content: self.inlines(element),
            }),
            "strong" | "b" => out.push(Inline::Strong {
                content: self.inlines(element),
            }),
            "s" | "strike" | "del" => out.push(Inline::Strikethrough {
                content: self.inlines(element),
            }),
            "u" | "ins" => out.push(Inline::Underline {
                content: self.inlines(element),
            }),
            "code" | "kbd" | "samp" | "tt" => out.push(Inline::Code {
                text: element.text().collect(),
            }),
            "a" => {
                let content = self.inlines(element);
                match el.attr("href") {
                    Some(href) if !href.trim().is_empty() => out.push(Inline::Link {
                        href: resolve_url(self.base, href.trim()),
                        content,
                    }),
                    _ => out.extend(content),
                }
            }
            "img" => {
                if let Some(src) = el.attr("src") {
                    out.push(Inline::Image {
                        src: resolve_url(self.base, src.trim()),
                        alt: el.attr("alt").unwrap_or_default().to_string(),
                    });
                }
            }
            "br" => out.push(Inline::LineBreak),
            name if SKIPPED.contains(&name) => {}
            _ => out.extend(self.inlines(element)),
        }
    }
}

fn is_block(name: &str) -> bool {
    BLOCKS.contains(&name) || CONTAINERS.contains(&name)
}

fn contains_block(element: ElementRef<'_>) -> bool {
    element
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|child| is_block(child.value().name()))
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    pending: Vec<Inline>,
}

impl BlockBuilder {
    fn paragraph(&mut self, inlines: Vec<Inline>) {
        let mut content = collapse(inlines);
        match content.as_slice() {
            [] => {}
            [Inline::Image { .. }] => {
                if let Some(Inline::Image { src, alt }) = content.pop() {
                    self.blocks.push(Block::Image { src, alt });
                }
            }
            _ => self.blocks.push(Block::Paragraph { content }),
        }
    }

    fn flush(&mut self) {
        let pending = mem::take(&mut self.pending);
        self.paragraph(pending);
    }

    fn block(&mut self, block: Block) {
        self.flush();
        self.blocks.push(block);
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

/// Collapse whitespace across a run of inlines and trim both ends.
pub fn collapse(inlines: Vec<Inline>) -> Vec<Inline> {
    let mut after_space = true;
    let mut out = collapse_into(inlines, &mut after_space);
    trim_end(&mut out);
    out
}

fn collapse_into(inlines: Vec<Inline>, after_space: &mut bool) -> Vec<Inline> {
    let mut out: Vec<Inline> = Vec::new();
    for inline in inlines {
        match inline {
            Inline::Text { text } => {
                let mut collapsed = String::with_capacity(text.len());
                for c in text.chars() {
                    if c.is_whitespace() {
                        if !*after_space {
                            collapsed.push(' ');
                            *after_space = true;
                        }
                    } else {
                        collapsed.push(c);
                        *after_space = false;
                    }
                }
                if collapsed.is_empty() {
                    continue;
                }
                if let Some(Inline::Text { text: previous }) = out.last_mut() {
                    previous.push_str(&collapsed);
                } else {
                    out.push(Inline::Text { text: collapsed });
                }
            }
            Inline::LineBreak => {
                trim_end(&mut out);
                out.push(Inline::LineBreak);
                *after_space = true;
            }
            Inline::Code { .. } | Inline::Image { .. } => {
                out.push(inline);
                *after_space = false;
            }
            mut container => {
                if let Some(content) = children_mut(&mut container) {
                    let collapsed = collapse_into(mem::take(content), after_space);
                    if collapsed.is_empty() {
                        continue;
                    }
                    *content = collapsed;
                }
                out.push(container);
            }
        }
    }
    out
}

fn children_mut(inline: &mut Inline) -> Option<&mut Vec<Inline>> {
    match inline {
        Inline::Emphasis { content }
        | Inline::Strong { content }
        | Inline::Strikethrough { content }
        | Inline::Underline { content }
        | Inline::Link { content, .. } => Some(content),
        _ => None,
    }
}

fn trim_end(inlines: &mut Vec<Inline>) {
    while let Some(last) = inlines.last_mut() {
        match last {
            Inline::Text { text } => {
                let trimmed = text.trim_end().len();
                if trimmed == 0 {
                    inlines.pop();
                    continue;
                }
                text.truncate(trimmed);
            }
            other => {
                if let Some(content) = children_mut(other) {
                    trim_end(content);
                    if content.is_empty() {
                        inlines.pop();
                        continue;
                    }
                }
            }
        }
        break;
    }
}
