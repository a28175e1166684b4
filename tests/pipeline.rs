//! End-to-end runs of the pipeline over fixture pages.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use glowfic_dl::error::{AppError, Result};
use glowfic_dl::models::{BookAssembler, Config, JsonAssembler, Manuscript, Target};
use glowfic_dl::pipeline::{FetchContext, Pipeline};
use glowfic_dl::storage::{LocalCache, PostCache};
use glowfic_dl::utils::http::PageSource;
use tempfile::TempDir;
use url::Url;

struct FixtureSite {
    pages: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl FixtureSite {
    fn new(pages: &[(&str, String)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, body)| (url.to_string(), body.clone()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for FixtureSite {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(url.to_string());
        self.pages
            .get(url.as_str())
            .map(|body| body.clone().into_bytes())
            .ok_or_else(|| AppError::not_found(url.as_str(), "HTTP 404 Not Found"))
    }
}

fn post_page(title: &str, replies: &[(&str, &str, &str)]) -> String {
    let mut html = format!(
        "<html><body><div id=\"content\"><div class=\"post-header\">\
         <span id=\"post-title\"><a href=\"#\">{title}</a></span></div>"
    );
    for (character, author, text) in replies {
        html.push_str(&format!(
            "<div class=\"post-container\">\
             <div class=\"post-character\">{character}</div>\
             <div class=\"post-author\">{author}</div>\
             <div class=\"post-content\"><p>{text}</p></div></div>"
        ));
    }
    html.push_str("</div></body></html>");
    html
}

fn context(site: Arc<FixtureSite>, dir: &TempDir) -> FetchContext {
    let mut config = Config::default();
    config.cache.dir = dir.path().to_path_buf();
    let cache = Arc::new(LocalCache::new(&config.cache.dir));
    FetchContext::new(Arc::new(config), site, cache).unwrap()
}

#[tokio::test]
async fn single_post_is_fetched_cached_and_assembled() {
    let site = Arc::new(FixtureSite::new(&[(
        "https://glowfic.com/posts/5111?page=1&per_page=25",
        post_page(
            "mad investor chaos",
            &[
                ("Keltham", "Iarwain", "Opening."),
                ("Carissa", "lintamande", "Reply one."),
                ("Keltham", "Iarwain", "Reply two."),
            ],
        ),
    )]));
    let tmp = TempDir::new().unwrap();

    let outcome = Pipeline::new(context(site.clone(), &tmp))
        .run("https://glowfic.com/posts/5111")
        .await
        .unwrap();

    assert_eq!(outcome.target, Target::Post(5111));
    assert_eq!(site.calls().len(), 1);
    assert_eq!(outcome.posts.len(), 1);

    let post = &outcome.posts[0];
    assert_eq!(post.id, 5111);
    assert_eq!(post.page_count, 1);
    assert_eq!(
        post.sections.iter().map(|s| s.index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert_eq!(post.authors, vec!["Iarwain", "lintamande"]);

    let cached = LocalCache::new(tmp.path()).get(5111).await.unwrap().unwrap();
    assert_eq!(cached.fingerprint, post.fingerprint);

    let bytes = JsonAssembler.assemble(&outcome.manuscript()).unwrap();
    let manuscript: Manuscript = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(manuscript.title, "mad investor chaos");
    let reply = &manuscript.chapters[0].sections[1];
    assert_eq!(reply.speaker, "Carissa");
    assert_eq!(reply.author.as_deref(), Some("lintamande"));

    // A second run is served entirely from the cache.
    let again = Pipeline::new(context(site.clone(), &tmp))
        .run("https://glowfic.com/posts/5111")
        .await
        .unwrap();
    assert_eq!(again.cache_hits, 1);
    assert_eq!(site.calls().len(), 1);
}

#[tokio::test]
async fn board_is_flattened_into_chapters() {
    let board = "<html><body><div id=\"content\"><table>\
        <tr><th class=\"table-title\">Sandbox</th></tr>\
        <tr><td class=\"post-subject\"><a href=\"/posts/1\">One</a></td></tr>\
        <tr><th class=\"table-title\"><a href=\"/board_sections/5\">Arc</a></th></tr>\
        <tr><td class=\"post-subject\"><a href=\"/posts/2\">Two</a></td></tr>\
        </table></div></body></html>"
        .to_string();
    let section = "<html><body><div id=\"content\"><table>\
        <tr><th class=\"table-title\">Arc</th></tr>\
        <tr><td class=\"post-subject\"><a href=\"/posts/2\">Two</a></td></tr>\
        <tr><td class=\"post-subject\"><a href=\"/posts/3\">Three</a></td></tr>\
        </table></div></body></html>"
        .to_string();

    let site = Arc::new(FixtureSite::new(&[
        ("https://glowfic.com/boards/9?page=1", board),
        ("https://glowfic.com/board_sections/5?page=1", section),
        (
            "https://glowfic.com/posts/1?page=1&per_page=25",
            post_page("One", &[("A", "a", "x")]),
        ),
        (
            "https://glowfic.com/posts/3?page=1&per_page=25",
            post_page("Three", &[("C", "c", "z")]),
        ),
    ]));
    let tmp = TempDir::new().unwrap();

    let outcome = Pipeline::new(context(site, &tmp))
        .run("https://glowfic.com/boards/9")
        .await
        .unwrap();

    assert_eq!(outcome.title, "Sandbox");
    let collection = outcome.collection.as_ref().unwrap();
    assert_eq!(collection.post_ids(), vec![1, 2, 3]);

    let titles: Vec<&str> = outcome.posts.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["One", "Three"]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].post_id, 2);
    assert!(!outcome.is_total_failure());
    assert_eq!(outcome.manuscript().chapters.len(), 2);
}
