// src/services/parser.rs

//! Page parsing for post pages and section/board listings.
//!
//! Parsing is a pure function of the response bytes. Errors carry the
//! placeholder context `"page"`; callers replace it with the page URL.

use chrono::NaiveDateTime;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Icon, PageSelectors, PostId, Section};
use crate::services::normalize::Normalizer;
use crate::utils::{normalize_whitespace, resolve_url};
use crate::utils::url::{extract_id, extract_reply_id};

const PAGE: &str = "page";

/// Format of the "last updated" column in listings, after whitespace cleanup.
const LISTING_TIME_FORMAT: &str = "%b %d, %Y %I:%M %p";

/// Post header data, present on the page carrying the post title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMetadata {
    pub title: String,
    pub authors: Vec<String>,
}

/// One parsed page of a post.
#[derive(Debug, Clone)]
pub struct PostPage {
    pub metadata: Option<PostMetadata>,
    /// Messages on this page, indexed from 0 within the page
    pub sections: Vec<Section>,
    pub has_next_page: bool,
}

/// One row or header of a section/board listing, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingEntry {
    Post {
        id: PostId,
        title: String,
        updated_at: Option<NaiveDateTime>,
    },
    /// Header linking to a board section
    Section { id: u64, title: String },
    /// Header linking to a board
    Board { id: u64, title: String },
    /// Header without a section or board link
    Heading { title: String },
}

/// One parsed page of a section or board listing.
#[derive(Debug, Clone)]
pub struct ListingPage {
    pub title: Option<String>,
    pub entries: Vec<ListingEntry>,
    pub has_next_page: bool,
}

/// Compiled selectors plus the site root used to resolve relative links.
pub struct PageParser {
    base: Url,
    content: Selector,
    flash_error: Selector,
    post_title: Selector,
    message: Selector,
    character: Selector,
    screen_name: Selector,
    author: Selector,
    message_body: Selector,
    icon: Selector,
    permalink: Selector,
    next_page: Selector,
    listing_heading: Selector,
    listing_subject: Selector,
    listing_time: Selector,
    listing_row: Selector,
    link: Selector,
    document_title: Selector,
}

impl PageParser {
    pub fn new(selectors: &PageSelectors, base: Url) -> Result<Self> {
        Ok(Self {
            base,
            content: Self::parse_selector(&selectors.content)?,
            flash_error: Self::parse_selector(&selectors.flash_error)?,
            post_title: Self::parse_selector(&selectors.post_title)?,
            message: Self::parse_selector(&selectors.message)?,
            character: Self::parse_selector(&selectors.character)?,
            screen_name: Self::parse_selector(&selectors.screen_name)?,
            author: Self::parse_selector(&selectors.author)?,
            message_body: Self::parse_selector(&selectors.message_body)?,
            icon: Self::parse_selector(&selectors.icon)?,
            permalink: Self::parse_selector(&selectors.permalink)?,
            next_page: Self::parse_selector(&selectors.next_page)?,
            listing_heading: Self::parse_selector(&selectors.listing_heading)?,
            listing_subject: Self::parse_selector(&selectors.listing_subject)?,
            listing_time: Self::parse_selector(&selectors.listing_time)?,
            listing_row: Self::parse_selector(&format!(
                "{}, {}",
                selectors.listing_heading, selectors.listing_subject
            ))?,
            link: Self::parse_selector("a[href]")?,
            document_title: Self::parse_selector("title")?,
        })
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }

    /// Parse one page of a post.
    pub fn parse_post_page(&self, raw: &[u8]) -> Result<PostPage> {
        let html = String::from_utf8_lossy(raw);
        let doc = Html::parse_document(&html);
        let content = self.content_root(&doc)?;

        let title = content
            .select(&self.post_title)
            .next()
            .map(text_of)
            .filter(|t| !t.is_empty());

        let sections = content
            .select(&self.message)
            .enumerate()
            .map(|(index, message)| self.parse_message(index, message))
            .collect::<Result<Vec<_>>>()?;

        if title.is_none() && sections.is_empty() {
            return Err(AppError::malformed(PAGE, "no post title and no messages"));
        }

        let metadata = title.map(|title| {
            let mut authors: Vec<String> = Vec::new();
            for author in sections.iter().filter_map(|s| s.author.as_ref()) {
                if !authors.contains(author) {
                    authors.push(author.clone());
                }
            }
            PostMetadata { title, authors }
        });

        Ok(PostPage {
            metadata,
            sections,
            has_next_page: self.has_next_page(&doc),
        })
    }

    fn parse_message(&self, index: usize, message: ElementRef<'_>) -> Result<Section> {
        let field = |selector: &Selector| {
            message
                .select(selector)
                .next()
                .map(text_of)
                .filter(|t| !t.is_empty())
        };

        let body = message
            .select(&self.message_body)
            .next()
            .ok_or_else(|| AppError::malformed(PAGE, format!("message {index} has no body")))?;

        let icon = message.select(&self.icon).next().and_then(|img| {
            let src = img.value().attr("src")?;
            Some(Icon {
                url: resolve_url(&self.base, src.trim()),
                alt: img.value().attr("alt").unwrap_or_default().to_string(),
            })
        });

        let reply_id = message
            .select(&self.permalink)
            .next()
            .and_then(|img| img.parent().and_then(ElementRef::wrap))
            .and_then(|a| a.value().attr("href"))
            .and_then(extract_reply_id);

        Ok(Section {
            index,
            speaker: field(&self.character).unwrap_or_default(),
            screen_name: field(&self.screen_name),
            author: field(&self.author),
            reply_id,
            icon,
            body: Normalizer::new(&self.base).blocks(body),
        })
    }

    /// Parse one page of a board section or board listing.
    pub fn parse_listing_page(&self, raw: &[u8]) -> Result<ListingPage> {
        let html = String::from_utf8_lossy(raw);
        let doc = Html::parse_document(&html);
        let content = self.content_root(&doc)?;

        let mut title = None;
        let mut entries = Vec::new();

        for el in content.select(&self.listing_row) {
            if self.listing_heading.matches(&el) {
                let entry = self.parse_heading(el);
                if title.is_none() {
                    title = match &entry {
                        ListingEntry::Section { title, .. }
                        | ListingEntry::Board { title, .. }
                        | ListingEntry::Heading { title } => Some(title.clone()),
                        ListingEntry::Post { .. } => None,
                    }
                    .filter(|t| !t.is_empty());
                }
                entries.push(entry);
            } else if let Some(entry) = self.parse_listing_post(el) {
                entries.push(entry);
            }
        }

        let title = title.or_else(|| {
            doc.select(&self.document_title)
                .next()
                .map(text_of)
                .filter(|t| !t.is_empty())
        });

        Ok(ListingPage {
            title,
            entries,
            has_next_page: self.has_next_page(&doc),
        })
    }

    fn parse_heading(&self, heading: ElementRef<'_>) -> ListingEntry {
        let href = heading
            .select(&self.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .unwrap_or_default();
        // Headers may carry trailing controls, the name is the leading text.
        let title = first_text(heading);

        if let Some(id) = extract_id(href, "board_sections") {
            ListingEntry::Section { id, title }
        } else if let Some(id) = extract_id(href, "boards") {
            ListingEntry::Board { id, title }
        } else {
            ListingEntry::Heading { title }
        }
    }

    fn parse_listing_post(&self, subject: ElementRef<'_>) -> Option<ListingEntry> {
        let link = subject
            .select(&self.link)
            .find(|a| a.value().attr("href").and_then(|h| extract_id(h, "posts")).is_some())?;
        let id = extract_id(link.value().attr("href")?, "posts")?;

        let updated_at = subject
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "tr")
            .and_then(|row| row.select(&self.listing_time).next())
            .and_then(parse_listing_time);

        Some(ListingEntry::Post {
            id,
            title: text_of(link),
            updated_at,
        })
    }

    /// The `#content` root, or the error the site flashed instead.
    fn content_root<'a>(&self, doc: &'a Html) -> Result<ElementRef<'a>> {
        if let Some(flash) = doc.select(&self.flash_error).next() {
            return Err(flash_error(&text_of(flash)));
        }
        doc.select(&self.content)
            .next()
            .ok_or_else(|| AppError::malformed(PAGE, "missing page content"))
    }

    fn has_next_page(&self, doc: &Html) -> bool {
        doc.select(&self.next_page).next().is_some()
    }
}

fn flash_error(message: &str) -> AppError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("log in") || lower.contains("sign in") {
        AppError::forbidden(PAGE, message)
    } else if lower.contains("not found") || lower.contains("could not be found") {
        AppError::not_found(PAGE, message)
    } else {
        AppError::malformed(PAGE, format!("site error: {message}"))
    }
}

fn text_of(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<String>())
}

fn first_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(normalize_whitespace)
        .find(|t| !t.is_empty())
        .unwrap_or_default()
}

/// "Jan 5, 2024 3:04 PM by alice" style cells; only the leading text counts.
fn parse_listing_time(cell: ElementRef<'_>) -> Option<NaiveDateTime> {
    let stamp = first_text(cell);
    let stamp = stamp.split(" by ").next().unwrap_or_default().trim();
    match NaiveDateTime::parse_from_str(stamp, LISTING_TIME_FORMAT) {
        Ok(time) => Some(time),
        Err(e) => {
            log::debug!("Unparseable listing time '{stamp}': {e}");
            None
        }
    }
}
