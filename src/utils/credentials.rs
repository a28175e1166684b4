//! Session cookie loading.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{AppError, Result};

/// Name of the Glowfic session cookie.
pub const COOKIE_NAME: &str = "_glowfic_constellation_production";

/// Session credential attached to every request.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie {
    value: String,
}

impl SessionCookie {
    /// Parse the contents of a cookie file.
    ///
    /// Accepts either `NAME=VALUE` (the name must be the Glowfic session
    /// cookie) or a bare value.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let value = match raw.split_once('=') {
            // Trailing '=' is base64 padding of a bare value, not a separator.
            Some((name, value)) if !value.is_empty() && !value.starts_with('=') => {
                if name.trim() != COOKIE_NAME {
                    return Err(AppError::config(format!(
                        "cookie file must start with \"{COOKIE_NAME}=\" (no quotes)"
                    )));
                }
                value.trim()
            }
            _ => raw,
        };
        if value.is_empty() {
            return Err(AppError::config("cookie file is empty"));
        }
        Ok(Self {
            value: value.to_string(),
        })
    }

    /// Load a cookie file; a missing file means no credential.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        match fs::read_to_string(path.as_ref()) {
            Ok(raw) => Self::parse(&raw).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Value for the `Cookie` request header.
    pub fn header_value(&self) -> String {
        format!("{COOKIE_NAME}={}", self.value)
    }
}

impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookie")
            .field("value", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_named_cookie() {
        let cookie = SessionCookie::parse("_glowfic_constellation_production=abc123\n").unwrap();
        assert_eq!(cookie.header_value(), "_glowfic_constellation_production=abc123");
    }

    #[test]
    fn parses_bare_value() {
        let cookie = SessionCookie::parse("  abc123 ").unwrap();
        assert_eq!(cookie.header_value(), "_glowfic_constellation_production=abc123");
    }

    #[test]
    fn rejects_wrong_cookie_name() {
        assert!(SessionCookie::parse("session=abc").is_err());
        assert!(SessionCookie::parse("   ").is_err());
    }

    #[test]
    fn padded_bare_value_is_kept_whole() {
        let cookie = SessionCookie::parse("YWJj==").unwrap();
        assert_eq!(cookie.header_value(), "_glowfic_constellation_production=YWJj==");
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(SessionCookie::load(tmp.path().join("cookie")).unwrap().is_none());
    }

    #[test]
    fn debug_hides_value() {
        let cookie = SessionCookie::parse("secret").unwrap();
        assert!(!format!("{cookie:?}").contains("secret"));
    }
}
