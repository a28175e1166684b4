// src/pipeline/context.rs

//! Per-run context shared by every fetch of one download.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Result;
use crate::models::Config;
use crate::services::{CollectionResolver, PageParser, PostFetcher};
use crate::storage::{LocalCache, PostCache};
use crate::utils::credentials::SessionCookie;
use crate::utils::http::{HttpClient, PageSource};
use crate::utils::limiter::RateLimiter;

/// Everything one run needs, constructed once and passed explicitly.
#[derive(Clone)]
pub struct FetchContext {
    pub config: Arc<Config>,
    pub base: Url,
    pub source: Arc<dyn PageSource>,
    pub cache: Arc<dyn PostCache>,
    pub parser: Arc<PageParser>,
    pub cancel: CancellationToken,
}

impl FetchContext {
    pub fn new(
        config: Arc<Config>,
        source: Arc<dyn PageSource>,
        cache: Arc<dyn PostCache>,
    ) -> Result<Self> {
        let base = config.site.base_url()?;
        let parser = Arc::new(PageParser::new(&config.selectors, base.clone())?);
        Ok(Self {
            config,
            base,
            source,
            cache,
            parser,
            cancel: CancellationToken::new(),
        })
    }

    /// Context backed by the real site and the on-disk cache.
    pub fn from_config(config: Arc<Config>, cookie: Option<&SessionCookie>) -> Result<Self> {
        config.validate()?;

        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
        log::debug!(
            "Rate limit: {} req/s, burst {}",
            limiter.requests_per_second(),
            limiter.burst()
        );
        let source = Arc::new(HttpClient::new(&config.http, cookie, limiter)?);
        let cache = Arc::new(LocalCache::new(&config.cache.dir));
        Self::new(config, source, cache)
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn post_fetcher(&self) -> PostFetcher {
        PostFetcher::new(
            self.source.clone(),
            self.parser.clone(),
            self.base.clone(),
            self.config.site.per_page,
            self.config.fetch.max_pages,
        )
    }

    pub fn resolver(&self) -> CollectionResolver {
        CollectionResolver::new(
            self.source.clone(),
            self.parser.clone(),
            self.base.clone(),
            self.config.fetch.max_pages,
            self.config.fetch.max_concurrent,
        )
    }
}
