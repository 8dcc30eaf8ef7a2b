//! Loading of the report metadata and feed list files.
//!
//! Both files are plain JSON. Any failure here is fatal and happens before
//! the pipeline touches the network.

use crate::error::ReportError;
use crate::models::{FeedList, ReportConfig};
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument};

/// Default location of the report metadata file.
pub const DEFAULT_REPORT_META_PATH: &str = "./knowledge/report_meta.json";
/// Default location of the feed list file.
pub const DEFAULT_FEEDS_PATH: &str = "./knowledge/feeds.json";

/// Load `report_meta.json`, filling in defaults for absent fields.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_report_config(path: &Path) -> Result<ReportConfig, ReportError> {
    let config: ReportConfig = load_json(path).await?;
    info!(
        topic = %config.topic,
        audience_level = %config.audience_level,
        articles_per_feed = config.articles_per_feed,
        sections = config.sections.len(),
        "Loaded report metadata"
    );
    Ok(config)
}

/// Load `feeds.json`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_feed_list(path: &Path) -> Result<FeedList, ReportError> {
    let feeds: FeedList = load_json(path).await?;
    info!(count = feeds.rss_feeds.len(), "Loaded feed list");
    debug!(feeds = ?feeds.rss_feeds, "Feed URLs");
    Ok(feeds)
}

async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ReportError> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|source| ReportError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&raw).map_err(|source| ReportError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_report_config_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report_meta.json");
        std::fs::write(
            &path,
            r#"{"topic": "Batteries", "sections": [{"title": "Supply", "description": "Lithium"}]}"#,
        )
        .unwrap();

        let config = load_report_config(&path).await.unwrap();
        assert_eq!(config.topic, "Batteries");
        assert_eq!(config.audience_level, "Beginner");
        assert_eq!(config.sections[0].description, "Lithium");
    }

    #[tokio::test]
    async fn test_missing_file_is_a_read_error() {
        let dir = tempdir().unwrap();
        let err = load_feed_list(&dir.path().join("nope.json")).await.unwrap_err();
        assert!(matches!(err, ReportError::ConfigRead { .. }));
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("feeds.json");
        std::fs::write(&path, "{\"rss_feeds\": [").unwrap();

        let err = load_feed_list(&path).await.unwrap_err();
        assert!(matches!(err, ReportError::ConfigParse { .. }));
    }
}
