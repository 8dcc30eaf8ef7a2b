//! Markdown rendering and writing of the final report.
//!
//! # Layout
//!
//! ```text
//! # {topic}
//!
//! ## Introduction
//!
//! {introduction}
//!
//! ## {section title}      (one block per section, configuration order)
//!
//! {section content}
//! ```

use crate::error::ReportError;
use crate::models::{ReportConfig, SectionSpec};
use std::fmt::Write;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Default location of the report.
pub const DEFAULT_OUTPUT_PATH: &str = "output/complete_report.md";

/// Assemble the report body from the topic, introduction and sections.
pub fn render_report(config: &ReportConfig) -> String {
    let mut md = String::new();

    writeln!(md, "# {}\n", config.topic).unwrap();
    writeln!(md, "## Introduction\n\n{}\n", config.introduction).unwrap();
    md.push_str(&render_sections(&config.sections));

    md
}

/// Render the `## {title}` blocks of the given sections, in order.
pub fn render_sections(sections: &[SectionSpec]) -> String {
    let mut md = String::new();
    for section in sections {
        writeln!(md, "## {}\n\n{}\n", section.title, section.content).unwrap();
    }
    md
}

/// Write `body` to `path`, replacing any previous report.
///
/// The parent directory is created when missing.
#[instrument(level = "info", skip_all, fields(path = %path.display(), bytes = body.len()))]
pub async fn write_report(path: &Path, body: &str) -> Result<(), ReportError> {
    let output_err = |source| ReportError::Output {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(output_err)?;
    }
    fs::write(path, body).await.map_err(output_err)?;

    info!("Wrote report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SectionSpec;
    use tempfile::tempdir;

    fn sample() -> ReportConfig {
        ReportConfig {
            topic: "T".into(),
            introduction: "I".into(),
            sections: vec![SectionSpec {
                title: "S".into(),
                description: "D".into(),
                content: "D".into(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_render_exact_layout() {
        assert_eq!(
            render_report(&sample()),
            "# T\n\n## Introduction\n\nI\n\n## S\n\nD\n\n"
        );
    }

    #[test]
    fn test_section_headings_match_config_order() {
        let mut config = sample();
        config.sections = ["Market Size", "Competitors", "Outlook"]
            .iter()
            .map(|t| SectionSpec {
                title: t.to_string(),
                ..Default::default()
            })
            .collect();

        let md = render_report(&config);
        let headings: Vec<_> = md
            .lines()
            .filter_map(|l| l.strip_prefix("## "))
            .filter(|h| *h != "Introduction")
            .collect();
        assert_eq!(headings, vec!["Market Size", "Competitors", "Outlook"]);
    }

    #[test]
    fn test_render_sections_matches_report_tail() {
        let config = sample();
        let sections = render_sections(&config.sections);
        assert_eq!(sections, "## S\n\nD\n\n");
        assert!(render_report(&config).ends_with(&sections));
        assert_eq!(render_sections(&[]), "");
    }

    #[tokio::test]
    async fn test_write_creates_parent_and_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output/complete_report.md");

        write_report(&path, "first run, a much longer body").await.unwrap();
        write_report(&path, "second").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }

    #[tokio::test]
    async fn test_write_into_file_path_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("output");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = write_report(&blocker.join("complete_report.md"), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Output { .. }));
    }
}
