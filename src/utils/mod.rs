//! Utility functions and helpers.

pub mod credentials;
pub mod fs;
pub mod http;
pub mod limiter;
pub mod url;

use ::url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://glowfic.com/posts/1").unwrap();
        assert_eq!(
            resolve_url(&base, "/replies/5#reply-5"),
            "https://glowfic.com/replies/5#reply-5"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x.png"),
            "https://other.com/x.png"
        );
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Jan 05,\n 2024   3:04 PM "), "Jan 05, 2024 3:04 PM");
    }
}
