// src/services/posts.rs

//! Fetching every page of one post into a [`Post`].

use std::pin::pin;
use std::sync::Arc;

use futures::{Stream, TryStreamExt, stream};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Fingerprinter, Post, PostId, Section};
use crate::services::parser::{PageParser, PostPage};
use crate::utils::http::PageSource;
use crate::utils::url::{post_page_url, post_url};

/// One fetched and parsed page of a post.
#[derive(Debug)]
pub struct FetchedPage {
    /// Page number, starting at 1
    pub number: u32,
    pub url: Url,
    pub raw: Vec<u8>,
    pub parsed: PostPage,
}

/// Assembles complete posts from paginated post pages.
pub struct PostFetcher {
    source: Arc<dyn PageSource>,
    parser: Arc<PageParser>,
    base: Url,
    per_page: u32,
    max_pages: u32,
}

impl PostFetcher {
    pub fn new(
        source: Arc<dyn PageSource>,
        parser: Arc<PageParser>,
        base: Url,
        per_page: u32,
        max_pages: u32,
    ) -> Self {
        Self {
            source,
            parser,
            base,
            per_page,
            max_pages,
        }
    }

    /// Pages of a post in order, fetched lazily one after another.
    ///
    /// The stream ends after the first page without a next-page control and
    /// yields an error (then ends) on the first failed or unparseable page.
    pub fn pages(&self, id: PostId) -> impl Stream<Item = Result<FetchedPage>> + '_ {
        stream::try_unfold(Some(1u32), move |next| async move {
            let Some(number) = next else {
                return Ok(None);
            };
            let page = self.fetch_page(id, number).await?;
            let next = page.parsed.has_next_page.then_some(number + 1);
            Ok::<_, AppError>(Some((page, next)))
        })
    }

    async fn fetch_page(&self, id: PostId, number: u32) -> Result<FetchedPage> {
        if number > self.max_pages {
            return Err(AppError::malformed(
                post_url(&self.base, id)?.as_str(),
                format!("more than {} pages", self.max_pages),
            ));
        }

        let url = post_page_url(&self.base, id, number, self.per_page)?;
        log::debug!("Fetching {url}");
        let raw = self.source.fetch(&url).await?;
        let parsed = self
            .parser
            .parse_post_page(&raw)
            .map_err(|e| e.with_page_context(url.as_str()))?;

        Ok(FetchedPage {
            number,
            url,
            raw,
            parsed,
        })
    }

    /// Fetch a whole post. Any failing page fails the post.
    pub async fn fetch_post(&self, id: PostId) -> Result<Post> {
        let mut pages = pin!(self.pages(id));
        let mut fingerprint = Fingerprinter::new();
        let mut metadata = None;
        let mut sections: Vec<Section> = Vec::new();
        let mut page_count = 0;

        while let Some(page) = pages.try_next().await? {
            fingerprint.update(&page.raw);
            page_count = page.number;

            if page.number == 1 {
                metadata = Some(page.parsed.metadata.ok_or_else(|| {
                    AppError::malformed(page.url.as_str(), "first page has no post title")
                })?);
            }
            for mut section in page.parsed.sections {
                section.index = sections.len();
                sections.push(section);
            }
        }

        let metadata = metadata.ok_or_else(|| {
            AppError::malformed(format!("post {id}"), "no pages were returned")
        })?;

        let mut authors = metadata.authors;
        for author in sections.iter().filter_map(|s| s.author.as_ref()) {
            if !authors.contains(author) {
                authors.push(author.clone());
            }
        }

        log::debug!(
            "Fetched post {id} '{}': {} sections over {page_count} pages",
            metadata.title,
            sections.len()
        );

        Ok(Post {
            id,
            title: metadata.title,
            authors,
            sections,
            page_count,
            fingerprint: fingerprint.finish(),
            url: post_url(&self.base, id)?.to_string(),
        })
    }
}
