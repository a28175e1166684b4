// src/models/selectors.rs

//! CSS selectors for scraping Glowfic pages.
//!
//! Kept in configuration so a markup change on the site can be patched
//! without a rebuild.

use serde::{Deserialize, Serialize};

/// CSS selectors for post and listing pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSelectors {
    /// Main content wrapper present on every regular page
    #[serde(default = "defaults::content")]
    pub content: String,

    /// Flash error banner shown instead of content
    #[serde(default = "defaults::flash_error")]
    pub flash_error: String,

    /// Post subject (post pages)
    #[serde(default = "defaults::post_title")]
    pub post_title: String,

    /// One message (opening post or reply)
    #[serde(default = "defaults::message")]
    pub message: String,

    /// Character name within a message
    #[serde(default = "defaults::character")]
    pub character: String,

    /// Character screen name within a message
    #[serde(default = "defaults::screen_name")]
    pub screen_name: String,

    /// Writer name within a message
    #[serde(default = "defaults::author")]
    pub author: String,

    /// Message body within a message
    #[serde(default = "defaults::message_body")]
    pub message_body: String,

    /// Character icon within a message
    #[serde(default = "defaults::icon")]
    pub icon: String,

    /// Permalink image; its parent anchor carries the reply URL
    #[serde(default = "defaults::permalink")]
    pub permalink: String,

    /// Enabled "next page" control
    #[serde(default = "defaults::next_page")]
    pub next_page: String,

    /// Table heading of a listing (collection title or section header)
    #[serde(default = "defaults::listing_heading")]
    pub listing_heading: String,

    /// Subject cell of a listed post
    #[serde(default = "defaults::listing_subject")]
    pub listing_subject: String,

    /// Last-updated cell of a listed post
    #[serde(default = "defaults::listing_time")]
    pub listing_time: String,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            content: defaults::content(),
            flash_error: defaults::flash_error(),
            post_title: defaults::post_title(),
            message: defaults::message(),
            character: defaults::character(),
            screen_name: defaults::screen_name(),
            author: defaults::author(),
            message_body: defaults::message_body(),
            icon: defaults::icon(),
            permalink: defaults::permalink(),
            next_page: defaults::next_page(),
            listing_heading: defaults::listing_heading(),
            listing_subject: defaults::listing_subject(),
            listing_time: defaults::listing_time(),
        }
    }
}

mod defaults {
    pub fn content() -> String {
        "div#content".into()
    }
    pub fn flash_error() -> String {
        "div.flash.error".into()
    }
    pub fn post_title() -> String {
        "#post-title".into()
    }
    pub fn message() -> String {
        "div.post-container".into()
    }
    pub fn character() -> String {
        "div.post-character".into()
    }
    pub fn screen_name() -> String {
        "div.post-screenname".into()
    }
    pub fn author() -> String {
        "div.post-author".into()
    }
    pub fn message_body() -> String {
        "div.post-content".into()
    }
    pub fn icon() -> String {
        "img.icon".into()
    }
    pub fn permalink() -> String {
        r#"img[title="Permalink"]"#.into()
    }
    pub fn next_page() -> String {
        "a.next_page, a[rel~=\"next\"]".into()
    }
    pub fn listing_heading() -> String {
        "th.table-title".into()
    }
    pub fn listing_subject() -> String {
        "td.post-subject".into()
    }
    pub fn listing_time() -> String {
        "td.post-time".into()
    }
}
