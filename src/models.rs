//! Data models for report configuration, sections and feed lists.
//!
//! This module defines the core data structures used throughout the application:
//! - [`ReportConfig`]: Report metadata loaded from `report_meta.json`
//! - [`SectionSpec`]: One titled, described unit of the final report
//! - [`FeedList`]: The RSS/Atom feeds to pull article links from
//!
//! Field names match the JSON files on disk and must not be renamed.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Topic used when the metadata file does not name one.
pub const DEFAULT_TOPIC: &str = "AI LLMs";
/// Audience level used when the metadata file does not name one.
pub const DEFAULT_AUDIENCE_LEVEL: &str = "Beginner";
/// Introduction used when the metadata file does not provide one.
pub const DEFAULT_INTRODUCTION: &str = "A report";
/// Articles taken from each feed when `articles_per_feed` is absent.
pub const DEFAULT_ARTICLES_PER_FEED: usize = 1;

/// Report metadata describing what to write and for whom.
///
/// Loaded once at the start of a run and never mutated afterwards. Section
/// content is filled in by building a new value with
/// [`ReportConfig::with_section_content`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReportConfig {
    /// The industry or subject the report covers.
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Reader expertise, e.g. "Beginner" or "Expert".
    #[serde(default = "default_audience_level")]
    pub audience_level: String,
    /// Free text placed under the "Introduction" heading.
    #[serde(default = "default_introduction")]
    pub introduction: String,
    /// How many entries to take from the top of every feed.
    #[serde(
        default = "default_articles_per_feed",
        deserialize_with = "deserialize_count"
    )]
    pub articles_per_feed: usize,
    /// Report sections in output order.
    #[serde(default)]
    pub sections: Vec<SectionSpec>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            audience_level: default_audience_level(),
            introduction: default_introduction(),
            articles_per_feed: DEFAULT_ARTICLES_PER_FEED,
            sections: Vec::new(),
        }
    }
}

impl ReportConfig {
    /// Return a copy of this config where section `index` carries `content`.
    ///
    /// Out-of-range indexes leave the sections untouched.
    pub fn with_section_content(mut self, index: usize, content: String) -> Self {
        if let Some(section) = self.sections.get_mut(index) {
            section.content = content;
        }
        self
    }
}

/// A single report section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SectionSpec {
    /// Heading of the section.
    #[serde(default)]
    pub title: String,
    /// Brief description of what the section should cover.
    #[serde(default)]
    pub description: String,
    /// Generated body; empty until the section has been written.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
}

/// Feeds to pull article links from, in processing order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeedList {
    pub rss_feeds: Vec<String>,
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

fn default_audience_level() -> String {
    DEFAULT_AUDIENCE_LEVEL.to_string()
}

fn default_introduction() -> String {
    DEFAULT_INTRODUCTION.to_string()
}

fn default_articles_per_feed() -> usize {
    DEFAULT_ARTICLES_PER_FEED
}

/// Accept either a JSON integer or a numeric string such as `"3"`.
fn deserialize_count<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    struct CountVisitor;

    impl Visitor<'_> for CountVisitor {
        type Value = usize;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a non-negative integer or a numeric string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<usize, E> {
            usize::try_from(v).map_err(|_| E::custom(format!("count {v} is too large")))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<usize, E> {
            usize::try_from(v).map_err(|_| E::custom(format!("count {v} must not be negative")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<usize, E> {
            v.trim()
                .parse::<usize>()
                .map_err(|_| E::custom(format!("invalid count {v:?}")))
        }
    }

    deserializer.deserialize_any(CountVisitor)
}
