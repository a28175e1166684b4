// src/models/mod.rs

//! Domain models for the downloader.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

pub mod body;
mod book;
mod collection;
mod config;
mod post;
mod selectors;

// Re-export all public types
pub use body::{Block, Inline};
pub use book::{BookAssembler, BookFormat, Chapter, ChapterSection, JsonAssembler, Manuscript};
pub use collection::{Collection, CollectionItem, CollectionKind, SectionSpan, Target};
pub use config::{CacheConfig, Config, FetchConfig, HttpConfig, RateLimitConfig, SiteConfig};
pub use post::{Fingerprinter, Icon, Post, PostId, Section, fingerprint};
pub use selectors::PageSelectors;
