//! Network-facing collectors.
//!
//! Each run follows the same two-phase pattern:
//!
//! 1. **Indexing**: [`feeds`] reads every configured RSS/Atom feed and keeps
//!    the first `articles_per_feed` entry links
//! 2. **Fetching**: [`article`] downloads each link and extracts its readable text
//!
//! Both phases run one request at a time, in feed order.

pub mod article;
pub mod feeds;

use reqwest::Client;
use std::error::Error;

/// Shared HTTP client for feeds and article pages.
pub fn http_client() -> Result<Client, Box<dyn Error>> {
    let client = Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
