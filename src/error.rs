//! Error taxonomy for a report run.
//!
//! Capability seams (feeds, scraping, the LLM client) report failures as
//! `Box<dyn Error>`; the pipeline wraps them into [`ReportError`] so the
//! caller can tell which stage failed.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("feed {url} failed: {reason}")]
    Feed { url: String, reason: String },

    #[error("scraping {url} failed: {reason}")]
    Scrape { url: String, reason: String },

    #[error("generating section {section:?} failed: {reason}")]
    Generation { section: String, reason: String },

    #[error("cannot write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_messages_name_the_failing_input() {
        let err = ReportError::Scrape {
            url: "https://example.com/a".into(),
            reason: "connection reset".into(),
        };
        assert_eq!(
            err.to_string(),
            "scraping https://example.com/a failed: connection reset"
        );

        let err = ReportError::Generation {
            section: "Market Size".into(),
            reason: "429".into(),
        };
        assert!(err.to_string().contains("\"Market Size\""));
    }

    #[test]
    fn test_config_errors_keep_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ReportError::ConfigRead {
            path: PathBuf::from("knowledge/feeds.json"),
            source: io,
        };
        assert!(err.to_string().contains("knowledge/feeds.json"));
        assert!(err.source().is_some());
    }
}
