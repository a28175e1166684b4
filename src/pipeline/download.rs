// src/pipeline/download.rs

//! The download pipeline: classify, resolve, fetch, reassemble.

use chrono::NaiveDateTime;
use futures::{StreamExt, stream};
use serde::Serialize;

use crate::error::{AppError, FailureKind, Result};
use crate::models::{Collection, CollectionItem, Manuscript, Post, PostId, Target};
use crate::pipeline::FetchContext;
use crate::services::PostFetcher;
use crate::utils::url::classify;

/// A post left out of the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostFailure {
    pub post_id: PostId,
    pub kind: FailureKind,
    pub message: String,
}

/// Result of one run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub target: Target,
    pub title: String,
    /// Posts in collection order
    pub posts: Vec<Post>,
    /// Omitted posts in collection order
    pub failures: Vec<PostFailure>,
    pub collection: Option<Collection>,
    pub cache_hits: usize,
    pub fetched: usize,
}

impl RunOutcome {
    /// Every listed post failed.
    pub fn is_total_failure(&self) -> bool {
        self.posts.is_empty() && !self.failures.is_empty()
    }

    pub fn manuscript(&self) -> Manuscript {
        Manuscript::new(&self.title, &self.posts)
    }
}

/// A post obtained for the run.
struct Obtained {
    post: Post,
    from_cache: bool,
}

/// Orchestrates one download over a [`FetchContext`].
pub struct Pipeline {
    ctx: FetchContext,
}

impl Pipeline {
    pub fn new(ctx: FetchContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &FetchContext {
        &self.ctx
    }

    /// Download everything reachable from `input`.
    ///
    /// For a post URL any failure aborts the run. For a section or board,
    /// failing posts are omitted and listed in [`RunOutcome::failures`].
    pub async fn run(&self, input: &str) -> Result<RunOutcome> {
        let target = classify(input, &self.ctx.base)?;
        log::info!("Downloading {target}");

        let (collection, items) = match target {
            Target::Post(id) => (
                None,
                vec![CollectionItem {
                    post_id: id,
                    title: String::new(),
                    updated_at: None,
                    section_id: None,
                }],
            ),
            Target::Section(_) | Target::Board(_) => {
                let collection = self.ctx.resolver().resolve(target).await?;
                log::info!(
                    "'{}' lists {} posts",
                    collection.title,
                    collection.items.len()
                );
                let items = collection.items.clone();
                (Some(collection), items)
            }
        };

        if items.is_empty() {
            log::warn!("{target} lists no posts");
        }

        let fetcher = self.ctx.post_fetcher();
        let concurrency = self.ctx.config.fetch.max_concurrent.max(1);
        let total = items.len();

        let mut results: Vec<(usize, PostId, Result<Obtained>)> = stream::iter(
            items.into_iter().enumerate(),
        )
        .map(|(index, item)| {
            let fetcher = &fetcher;
            async move {
                let result = self.obtain(fetcher, item.post_id, item.updated_at).await;
                (index, item.post_id, result)
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;
        results.sort_by_key(|(index, _, _)| *index);

        let mut outcome = RunOutcome {
            target,
            title: collection
                .as_ref()
                .map(|c| c.title.clone())
                .unwrap_or_default(),
            posts: Vec::with_capacity(total),
            failures: Vec::new(),
            collection,
            cache_hits: 0,
            fetched: 0,
        };

        for (_, post_id, result) in results {
            match result {
                Ok(obtained) => {
                    if obtained.from_cache {
                        outcome.cache_hits += 1;
                    } else {
                        outcome.fetched += 1;
                    }
                    outcome.posts.push(obtained.post);
                }
                Err(e) if matches!(target, Target::Post(_)) => return Err(e),
                Err(e) => {
                    log::warn!("Omitting post {post_id}: {e}");
                    outcome.failures.push(PostFailure {
                        post_id,
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if let (Target::Post(_), Some(post)) = (target, outcome.posts.first()) {
            outcome.title = post.title.clone();
        }

        log::info!(
            "Done: {} of {total} posts ({} fetched, {} from cache), {} omitted",
            outcome.posts.len(),
            outcome.fetched,
            outcome.cache_hits,
            outcome.failures.len()
        );
        Ok(outcome)
    }

    /// Cached copy when fresh, otherwise a fetch followed by a cache write.
    async fn obtain(
        &self,
        fetcher: &PostFetcher,
        id: PostId,
        listed_at: Option<NaiveDateTime>,
    ) -> Result<Obtained> {
        if self.ctx.cancel.is_cancelled() {
            return Err(AppError::Cancelled(format!("post {id}")));
        }

        if !self.ctx.config.fetch.refresh {
            match self.ctx.cache.get(id).await {
                Ok(Some(entry)) if !entry.is_stale(listed_at) => {
                    log::debug!("Post {id} served from cache");
                    return Ok(Obtained {
                        post: entry.post,
                        from_cache: true,
                    });
                }
                Ok(Some(_)) => log::debug!("Post {id} updated since it was cached"),
                Ok(None) => {}
                Err(e) => log::warn!("Ignoring unreadable cache entry for post {id}: {e}"),
            }
        }

        let post = fetcher.fetch_post(id).await?;
        log::info!("Fetched post {id}: {}", post.title);

        if let Err(e) = self.ctx.cache.put(&post, listed_at).await {
            log::warn!("Could not cache post {id}: {e}");
        }
        Ok(Obtained {
            post,
            from_cache: false,
        })
    }
}
