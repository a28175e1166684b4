//! File name helpers for book output.

use std::ops::RangeInclusive;

use crate::error::{AppError, Result};

const BANNED_CHARS: &[char] = &['/', '\\', '"', '*', ':', '<', '>', '?', '|', '\u{7f}'];

const BANNED_RANGES: &[RangeInclusive<u32>] = &[
    0x0000..=0x001f,     // C0
    0x0080..=0x009f,     // C1
    0xe000..=0xf8ff,     // Private Use Area
    0xfdd0..=0xfdef,     // Arabic Presentation Forms-A non-characters
    0xfff0..=0xffff,     // Specials
    0xe0000..=0xe0fff,   // Tags and Variation Selectors Supplement
    0xf0000..=0xfffff,   // Supplementary Private Use Area-A
    0x100000..=0x10ffff, // Supplementary Private Use Area-B
];

const MAX_NAME_BYTES: usize = 255;

fn is_allowed(c: char) -> bool {
    !BANNED_CHARS.contains(&c) && !BANNED_RANGES.iter().any(|r| r.contains(&(c as u32)))
}

/// Make a file name acceptable inside an EPUB 3 container.
///
/// Drops banned characters, strips trailing dots and truncates the stem so
/// the name fits in 255 UTF-8 bytes while keeping the extension.
pub fn sanitize_filename(name: &str) -> Result<String> {
    let filtered: String = name.chars().filter(|&c| is_allowed(c)).collect();
    let filtered = filtered.trim_end_matches('.');

    if filtered.is_empty() {
        return Err(AppError::validation(format!(
            "file name '{name}' has only invalid characters and/or periods"
        )));
    }
    if filtered.len() <= MAX_NAME_BYTES {
        return Ok(filtered.to_string());
    }

    let Some((stem, ext)) = filtered.rsplit_once('.') else {
        return Ok(truncate_bytes(filtered, MAX_NAME_BYTES).to_string());
    };
    if ext.len() > MAX_NAME_BYTES - 1 {
        return Err(AppError::validation(format!(
            "file name extension is longer than {} bytes",
            MAX_NAME_BYTES - 1
        )));
    }

    let mut stem: Vec<char> = stem.chars().collect();
    stem.pop();
    let budget = MAX_NAME_BYTES - ext.len() - 1;
    while stem.iter().map(|c| c.len_utf8()).sum::<usize>() > budget {
        stem.pop();
    }
    Ok(format!("{}.{ext}", stem.into_iter().collect::<String>()))
}

/// Longest prefix of `s` within `max` bytes, cut on a character boundary.
fn truncate_bytes(s: &str, max: usize) -> &str {
    let end = s
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= max)
        .last()
        .unwrap_or(0);
    &s[..end]
}
