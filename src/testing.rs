//! In-memory page source and page builders shared by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::{AppError, FailureKind, Result};
use crate::utils::http::PageSource;

pub const PER_PAGE: u32 = 25;

pub fn base() -> Url {
    Url::parse("https://glowfic.com").unwrap()
}

pub fn post_page_url(id: u64, page: u32) -> String {
    format!("https://glowfic.com/posts/{id}?page={page}&per_page={PER_PAGE}")
}

pub fn listing_url(kind: &str, id: u64, page: u32) -> String {
    format!("https://glowfic.com/{kind}/{id}?page={page}")
}

/// A post page; `title` is only rendered on the first page of a real post.
pub fn post_page(title: Option<&str>, messages: &[&str], next: bool) -> String {
    let mut html = String::from("<html><body><div id=\"content\">");
    if let Some(title) = title {
        html.push_str(&format!("<span id=\"post-title\">{title}</span>"));
    }
    for (i, message) in messages.iter().enumerate() {
        html.push_str(&format!(
            "<div class=\"post-container\"><div class=\"post-character\">Speaker {i}</div>\
             <div class=\"post-author\">author{}</div>\
             <div class=\"post-content\"><p>{message}</p></div></div>",
            i % 2
        ));
    }
    if next {
        html.push_str("<a class=\"next_page\" rel=\"next\" href=\"#\">Next</a>");
    }
    html.push_str("</div></body></html>");
    html
}

/// Rows for a listing table: a `th` header or a post subject cell.
pub enum Row<'a> {
    Heading(&'a str, Option<&'a str>),
    Post(u64, &'a str),
}

pub fn listing_page(rows: &[Row<'_>], next: bool) -> String {
    let mut html = String::from("<html><body><div id=\"content\"><table>");
    for row in rows {
        match row {
            Row::Heading(title, Some(href)) => html.push_str(&format!(
                "<tr><th class=\"table-title\"><a href=\"{href}\">{title}</a></th></tr>"
            )),
            Row::Heading(title, None) => {
                html.push_str(&format!("<tr><th class=\"table-title\">{title}</th></tr>"))
            }
            Row::Post(id, updated) => html.push_str(&format!(
                "<tr><td class=\"post-subject\"><a href=\"/posts/{id}\">Post {id}</a></td>\
                 <td class=\"post-time\">{updated} by someone</td></tr>"
            )),
        }
    }
    html.push_str("</table>");
    if next {
        html.push_str("<a class=\"next_page\" href=\"#\">Next</a>");
    }
    html.push_str("</div></body></html>");
    html
}

/// Page source answering from a fixed map of URLs.
#[derive(Default)]
pub struct MockSource {
    pages: HashMap<String, std::result::Result<Vec<u8>, FailureKind>>,
    delays: HashMap<String, Duration>,
    default_delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), Ok(body.into().into_bytes()));
        self
    }

    pub fn fail(mut self, url: impl Into<String>, kind: FailureKind) -> Self {
        self.pages.insert(url.into(), Err(kind));
        self
    }

    pub fn delay(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(url.into(), delay);
        self
    }

    pub fn default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    /// A single-page post with `count` messages.
    pub fn post(self, id: u64, count: usize) -> Self {
        let messages: Vec<String> = (0..count).map(|i| format!("post {id} message {i}")).collect();
        let messages: Vec<&str> = messages.iter().map(String::as_str).collect();
        let title = format!("Post {id}");
        self.page(post_page_url(id, 1), post_page(Some(&title), &messages, false))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for MockSource {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let key = url.to_string();
        self.calls.lock().unwrap().push(key.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&key).copied().or(self.default_delay) {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.pages.get(&key) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(kind)) => Err(error_of_kind(*kind, &key)),
            None => Err(AppError::not_found(key, "HTTP 404 Not Found")),
        }
    }
}

fn error_of_kind(kind: FailureKind, url: &str) -> AppError {
    match kind {
        FailureKind::Forbidden => AppError::forbidden(url, "HTTP 403 Forbidden"),
        FailureKind::NotFound => AppError::not_found(url, "HTTP 404 Not Found"),
        FailureKind::Malformed => AppError::malformed(url, "garbage"),
        FailureKind::InvalidUrl => AppError::invalid_url(url, "bad"),
        FailureKind::Cancelled => AppError::Cancelled(url.to_string()),
        FailureKind::Unreachable | FailureKind::Storage => {
            AppError::unreachable(url, "gave up after 3 retries")
        }
    }
}
