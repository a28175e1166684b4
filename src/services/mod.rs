//! Service layer for the downloader.
//!
//! This module contains the logic for:
//! - Page parsing (`PageParser`) and markup normalization (`Normalizer`)
//! - Post assembly across pages (`PostFetcher`)
//! - Section and board resolution (`CollectionResolver`)

pub mod collections;
pub mod normalize;
pub mod parser;
pub mod posts;

pub use collections::CollectionResolver;
pub use normalize::Normalizer;
pub use parser::{ListingEntry, ListingPage, PageParser, PostMetadata, PostPage};
pub use posts::{FetchedPage, PostFetcher};
