//! # Market Research Report
//!
//! Builds a market-research report from a handful of RSS feeds: article
//! links are collected from each feed, the articles are scraped, and an
//! OpenAI-compatible LLM writes every configured section from the combined
//! article text. The sections are concatenated under the topic and
//! introduction and saved as Markdown.
//!
//! ## Usage
//!
//! ```sh
//! market_research_report                 # same as `run`
//! market_research_report run --on-feed-error abort
//! market_research_report plot            # writes report_creator_flow.html
//! ```
//!
//! ## Architecture
//!
//! The application is a strictly sequential pipeline:
//! 1. **LoadConfig**: read `knowledge/report_meta.json` and `knowledge/feeds.json`
//! 2. **FetchArticles**: take the first `articles_per_feed` links of every feed
//! 3. **ScrapeArticles**: extract the readable text of every link
//! 4. **GenerateReport**: write each section, then save `output/complete_report.md`
//!
//! The model configuration and chat template are resolved before the
//! pipeline starts, so a broken `config.yaml` is reported ahead of any input
//! file problem. The input files are then read, and the output directory
//! checked, in `LoadConfig`, before the first network request.

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod pipeline;
mod report;
mod scrapers;
mod utils;

use api::{AskFnWrapper, RetryAsk, llm_config_path, load_llm};
use cli::{Cli, Command, PlotArgs, RunArgs};
use outputs::markdown::render_sections;
use outputs::plot::write_flow_plot;
use pipeline::ReportPipeline;
use report::LlmSectionWriter;
use scrapers::article::HttpArticleSource;
use scrapers::feeds::HttpFeedSource;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    match args.into_command() {
        Command::Run(run_args) => run(run_args).await,
        Command::Plot(plot_args) => plot(plot_args).await,
    }
}

async fn run(args: RunArgs) -> Result<(), Box<dyn Error>> {
    info!("=== Create Your Comprehensive Report ===");

    // ---- Model config & template ----
    let llm_path = llm_config_path(args.llm_config.as_deref())?;
    let (llm_config, template) = match load_llm(&llm_path, &args.template).await {
        Ok(loaded) => loaded,
        Err(e) => {
            error!(path = %llm_path.display(), template = %args.template, error = %e, "Failed to load model configuration");
            return Err(e);
        }
    };

    let client = scrapers::http_client()?;
    let ask = AskFnWrapper {
        config: &llm_config,
        template: &template,
    };
    let writer = LlmSectionWriter::new(RetryAsk::new(
        ask,
        args.generation_retries,
        Duration::from_secs(1),
    ));

    let pipeline = ReportPipeline::new(
        HttpFeedSource::new(client.clone()),
        HttpArticleSource::new(client),
        writer,
        args.policy(),
        args.paths(),
    );

    match pipeline.run().await {
        Ok(summary) => {
            for (index, section) in summary.sections.iter().enumerate() {
                info!(index, title = %section.title, bytes = section.content.len(), "Saved section");
            }
            if args.echo_sections {
                print!("{}", render_sections(&summary.sections));
            }
            info!(path = %summary.output.display(), "=== Flow Complete === Your report is ready");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Report run aborted; no report written");
            Err(e.into())
        }
    }
}

async fn plot(args: PlotArgs) -> Result<(), Box<dyn Error>> {
    write_flow_plot(&args.output).await?;
    info!(path = %args.output.display(), "Open the page in a browser to view the flow");
    Ok(())
}
