//! Command-line interface definitions.
//!
//! `run` is the default sub-command, so invoking the binary with no
//! arguments builds the report from `./knowledge/*.json`.

use crate::config::{DEFAULT_FEEDS_PATH, DEFAULT_REPORT_META_PATH};
use crate::outputs::markdown::DEFAULT_OUTPUT_PATH;
use crate::outputs::plot::DEFAULT_PLOT_PATH;
use crate::pipeline::{FailurePolicy, OnError, ReportPaths};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Assemble a market-research report from RSS feeds and LLM-written sections.
///
/// ```sh
/// market_research_report
/// market_research_report run --feeds ./feeds.json --on-feed-error abort
/// market_research_report plot --output flow.html
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The selected sub-command, defaulting to `run` with default options.
    pub fn into_command(self) -> Command {
        self.command
            .unwrap_or_else(|| Command::Run(RunArgs::default()))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the report (default)
    Run(RunArgs),
    /// Write an HTML flowchart of the pipeline stages
    Plot(PlotArgs),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct RunArgs {
    /// Report metadata (topic, audience, sections)
    #[arg(long, default_value = DEFAULT_REPORT_META_PATH)]
    pub report_meta: PathBuf,

    /// Feed list (`rss_feeds`)
    #[arg(long, default_value = DEFAULT_FEEDS_PATH)]
    pub feeds: PathBuf,

    /// Where to write the Markdown report
    #[arg(short, long, default_value = DEFAULT_OUTPUT_PATH)]
    pub output: PathBuf,

    /// Path to the model config.yaml (defaults to the awful_aj config directory)
    #[arg(short = 'c', long, env = "REPORT_LLM_CONFIG")]
    pub llm_config: Option<PathBuf>,

    /// Name of the chat template used to write sections
    #[arg(short, long, default_value = "market_report")]
    pub template: String,

    /// Extra attempts per section when the model call fails
    #[arg(long, default_value_t = 0)]
    pub generation_retries: usize,

    /// What to do when a feed cannot be fetched or parsed
    #[arg(long, value_enum, default_value_t = OnError::Skip)]
    pub on_feed_error: OnError,

    /// What to do when an article cannot be scraped
    #[arg(long, value_enum, default_value_t = OnError::Abort)]
    pub on_scrape_error: OnError,

    /// Print every generated section to stdout once the report is saved
    #[arg(long)]
    pub echo_sections: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            report_meta: PathBuf::from(DEFAULT_REPORT_META_PATH),
            feeds: PathBuf::from(DEFAULT_FEEDS_PATH),
            output: PathBuf::from(DEFAULT_OUTPUT_PATH),
            llm_config: std::env::var_os("REPORT_LLM_CONFIG").map(PathBuf::from),
            template: "market_report".to_string(),
            generation_retries: 0,
            on_feed_error: OnError::Skip,
            on_scrape_error: OnError::Abort,
            echo_sections: false,
        }
    }
}

impl RunArgs {
    pub fn paths(&self) -> ReportPaths {
        ReportPaths {
            report_meta: self.report_meta.clone(),
            feeds: self.feeds.clone(),
            output: self.output.clone(),
        }
    }

    pub fn policy(&self) -> FailurePolicy {
        FailurePolicy {
            on_feed_error: self.on_feed_error,
            on_scrape_error: self.on_scrape_error,
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct PlotArgs {
    /// Where to write the HTML page
    #[arg(short, long, default_value = DEFAULT_PLOT_PATH)]
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_defaults_to_run() {
        let cli = Cli::parse_from(["market_research_report"]);
        match cli.into_command() {
            Command::Run(args) => {
                assert_eq!(args.report_meta, PathBuf::from("./knowledge/report_meta.json"));
                assert_eq!(args.output, PathBuf::from("output/complete_report.md"));
                assert_eq!(args.policy(), FailurePolicy::default());
                assert!(!args.echo_sections);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::parse_from([
            "market_research_report",
            "run",
            "--feeds",
            "/tmp/feeds.json",
            "-o",
            "/tmp/report.md",
            "--generation-retries",
            "3",
            "--on-feed-error",
            "abort",
            "--on-scrape-error",
            "skip",
            "--echo-sections",
        ]);

        let Command::Run(args) = cli.into_command() else {
            panic!("expected run");
        };
        assert_eq!(args.feeds, PathBuf::from("/tmp/feeds.json"));
        assert_eq!(args.paths().output, PathBuf::from("/tmp/report.md"));
        assert_eq!(args.generation_retries, 3);
        assert_eq!(args.policy().on_feed_error, OnError::Abort);
        assert_eq!(args.policy().on_scrape_error, OnError::Skip);
        assert!(args.echo_sections);
    }

    #[test]
    fn test_plot_default_path() {
        let cli = Cli::parse_from(["market_research_report", "plot"]);
        let Command::Plot(args) = cli.into_command() else {
            panic!("expected plot");
        };
        assert_eq!(args.output, PathBuf::from("report_creator_flow.html"));
    }
}
