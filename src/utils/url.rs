// src/utils/url.rs

//! URL classification and construction for the source site.

use url::Url;

use crate::error::{AppError, Result};
use crate::models::{PostId, Target};

/// Classify an input URL by its path shape.
///
/// # Examples
/// ```
/// use glowfic_dl::models::Target;
/// use glowfic_dl::utils::url::classify;
/// use url::Url;
///
/// let base = Url::parse("https://glowfic.com").unwrap();
/// assert_eq!(
///     classify("https://glowfic.com/posts/5111", &base).unwrap(),
///     Target::Post(5111)
/// );
/// ```
pub fn classify(input: &str, base: &Url) -> Result<Target> {
    let url = Url::parse(input.trim()).map_err(|e| AppError::invalid_url(input, e))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::invalid_url(input, "only http(s) URLs are supported"));
    }
    if !same_site(&url, base) {
        return Err(AppError::invalid_url(
            input,
            format!("not a {} URL", base.host_str().unwrap_or_default()),
        ));
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let (kind, id) = match segments.as_slice() {
        [kind, id] => (*kind, *id),
        _ => {
            return Err(AppError::invalid_url(
                input,
                "expected /posts/<id>, /board_sections/<id> or /boards/<id>",
            ));
        }
    };
    let id: u64 = id
        .parse()
        .map_err(|_| AppError::invalid_url(input, format!("'{id}' is not a numeric id")))?;

    match kind {
        "posts" => Ok(Target::Post(id)),
        "board_sections" => Ok(Target::Section(id)),
        "boards" => Ok(Target::Board(id)),
        other => Err(AppError::invalid_url(
            input,
            format!("unsupported page type '{other}'"),
        )),
    }
}

/// Hosts match ignoring a leading `www.`.
///
/// Ports are compared only when one side names one explicitly, so `http`
/// and `https` links to the same host both match.
pub fn same_site(url: &Url, base: &Url) -> bool {
    fn bare(host: Option<&str>) -> Option<String> {
        host.map(|h| h.trim_start_matches("www.").to_ascii_lowercase())
    }
    let ports_match = match (url.port(), base.port()) {
        (None, None) => true,
        _ => url.port_or_known_default() == base.port_or_known_default(),
    };
    bare(url.host_str()).is_some() && bare(url.host_str()) == bare(base.host_str()) && ports_match
}

/// Canonical URL of a post.
pub fn post_url(base: &Url, id: PostId) -> Result<Url> {
    Ok(base.join(&format!("/posts/{id}"))?)
}

/// URL of one page of a post.
pub fn post_page_url(base: &Url, id: PostId, page: u32, per_page: u32) -> Result<Url> {
    let mut url = post_url(base, id)?;
    url.query_pairs_mut()
        .append_pair("page", &page.to_string())
        .append_pair("per_page", &per_page.to_string());
    Ok(url)
}

/// URL of one page of a board section or board listing.
pub fn listing_page_url(base: &Url, target: Target, page: u32) -> Result<Url> {
    let path = match target {
        Target::Section(id) => format!("/board_sections/{id}"),
        Target::Board(id) => format!("/boards/{id}"),
        Target::Post(_) => {
            return Err(AppError::invalid_url(
                target.to_string(),
                "a post has no listing",
            ));
        }
    };
    let mut url = base.join(&path)?;
    url.query_pairs_mut()
        .append_pair("page", &page.to_string());
    Ok(url)
}

/// Extract the numeric id following `/<kind>/` in an href.
///
/// Works on relative and absolute hrefs and ignores queries and fragments.
pub fn extract_id(href: &str, kind: &str) -> Option<u64> {
    let needle = format!("/{kind}/");
    let start = href.find(&needle)? + needle.len();
    let digits: String = href[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Reply id from a permalink such as `/replies/123#reply-123`.
pub fn extract_reply_id(href: &str) -> Option<u64> {
    extract_id(href, "replies").or_else(|| {
        let (_, fragment) = href.split_once("#reply-")?;
        fragment.parse().ok()
    })
}
