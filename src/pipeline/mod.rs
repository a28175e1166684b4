//! Pipeline entry points.
//!
//! - `FetchContext`: config, page source, cache and cancellation for one run
//! - `Pipeline::run`: classify a URL, resolve it, fetch its posts in order

pub mod context;
pub mod download;

pub use context::FetchContext;
pub use download::{Pipeline, PostFailure, RunOutcome};
