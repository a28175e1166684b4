// src/error.rs

//! Unified error handling for the downloader.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for downloader operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Coarse failure category reported to the user for omitted posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    InvalidUrl,
    Unreachable,
    Forbidden,
    NotFound,
    Malformed,
    Cancelled,
    Storage,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::InvalidUrl => "InvalidUrl",
            FailureKind::Unreachable => "Unreachable",
            FailureKind::Forbidden => "Forbidden",
            FailureKind::NotFound => "NotFound",
            FailureKind::Malformed => "Malformed",
            FailureKind::Cancelled => "Cancelled",
            FailureKind::Storage => "Storage",
        };
        f.write_str(name)
    }
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Input URL does not match a post, board section or board
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// Network failure after retries were exhausted
    #[error("Unreachable {url}: {message}")]
    Unreachable { url: String, message: String },

    /// Authentication required or denied
    #[error("Forbidden {url}: {message}")]
    Forbidden { url: String, message: String },

    /// Post or collection does not exist
    #[error("Not found {url}: {message}")]
    NotFound { url: String, message: String },

    /// Response structure was not recognized
    #[error("Malformed response for {context}: {message}")]
    Malformed { context: String, message: String },

    /// Run was cancelled before this item started
    #[error("Cancelled before fetching {0}")]
    Cancelled(String),

    /// Failure while resolving a board or board section
    #[error("{context}: {source}")]
    Collection {
        context: String,
        #[source]
        source: Box<AppError>,
    },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built or a request could not be constructed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create an unreachable error.
    pub fn unreachable(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Unreachable {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a forbidden error.
    pub fn forbidden(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Forbidden {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::NotFound {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a malformed-response error.
    pub fn malformed(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Malformed {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Wrap an error with the board or section it happened in.
    pub fn in_collection(self, context: impl Into<String>) -> Self {
        Self::Collection {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Replace the context of a malformed error, leaving other kinds intact.
    ///
    /// The page parser has no idea which URL it is looking at.
    pub fn with_page_context(self, context: impl Into<String>) -> Self {
        match self {
            Self::Malformed { message, .. } => Self::Malformed {
                context: context.into(),
                message,
            },
            Self::Forbidden { message, .. } => Self::Forbidden {
                url: context.into(),
                message,
            },
            Self::NotFound { message, .. } => Self::NotFound {
                url: context.into(),
                message,
            },
            other => other,
        }
    }

    /// Category used in the omission report and for exit codes.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidUrl { .. } | Self::Url(_) => FailureKind::InvalidUrl,
            Self::Unreachable { .. } | Self::Http(_) => FailureKind::Unreachable,
            Self::Forbidden { .. } => FailureKind::Forbidden,
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::Malformed { .. } | Self::Selector { .. } => FailureKind::Malformed,
            Self::Cancelled(_) => FailureKind::Cancelled,
            Self::Collection { source, .. } => source.kind(),
            Self::Io(_)
            | Self::Json(_)
            | Self::Toml(_)
            | Self::Config(_)
            | Self::Validation(_) => FailureKind::Storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_context_keeps_kind() {
        let err = AppError::not_found("https://glowfic.com/posts/2", "HTTP 404")
            .in_collection("section 7");
        assert_eq!(err.kind(), FailureKind::NotFound);
        assert!(err.to_string().starts_with("section 7: "));
    }

    #[test]
    fn page_context_replaces_parser_placeholder() {
        let err = AppError::malformed("page", "missing #content")
            .with_page_context("https://glowfic.com/posts/1?page=2");
        assert_eq!(
            err.to_string(),
            "Malformed response for https://glowfic.com/posts/1?page=2: missing #content"
        );
    }

    #[test]
    fn failure_kind_display() {
        assert_eq!(FailureKind::NotFound.to_string(), "NotFound");
        assert_eq!(FailureKind::Unreachable.to_string(), "Unreachable");
    }
}
