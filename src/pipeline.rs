//! The report pipeline as an explicit state machine.
//!
//! ```text
//! LoadConfig → FetchArticles → ScrapeArticles → GenerateReport → Done
//! ```
//!
//! Every stage consumes the full output of the previous one; nothing runs
//! concurrently. The three external capabilities (feed parsing, scraping,
//! text generation) are injected through [`FeedSource`], [`ArticleSource`]
//! and [`SectionWriter`].

use crate::config::{load_feed_list, load_report_config};
use crate::error::ReportError;
use crate::models::{FeedList, ReportConfig, SectionSpec};
use crate::outputs::markdown::{render_report, write_report};
use crate::report::{SectionWriter, generate_sections};
use crate::utils::ensure_writable_parent;
use clap::ValueEnum;
use itertools::Itertools;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Feed-parsing capability: URL in, ordered entry links out.
pub trait FeedSource {
    async fn entry_links(&self, feed_url: &str, limit: usize) -> Result<Vec<String>, Box<dyn Error>>;
}

/// Scraping capability: URL in, readable text out.
pub trait ArticleSource {
    async fn scrape(&self, url: &str) -> Result<String, Box<dyn Error>>;
}

/// What to do when a feed or article cannot be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnError {
    /// Log a warning and continue without the failed input.
    Skip,
    /// Abort the run.
    Abort,
}

/// Per-stage failure handling.
///
/// The defaults keep the historical behaviour: a broken feed contributes no
/// URLs, a broken article aborts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicy {
    pub on_feed_error: OnError,
    pub on_scrape_error: OnError,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            on_feed_error: OnError::Skip,
            on_scrape_error: OnError::Abort,
        }
    }
}

/// Input and output locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub report_meta: PathBuf,
    pub feeds: PathBuf,
    pub output: PathBuf,
}

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    LoadConfig,
    FetchArticles,
    ScrapeArticles,
    GenerateReport,
    Done,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 5] = [
        Stage::LoadConfig,
        Stage::FetchArticles,
        Stage::ScrapeArticles,
        Stage::GenerateReport,
        Stage::Done,
    ];

    /// The stage that follows `self`, or `None` after [`Stage::Done`].
    ///
    /// # Example
    ///
    /// ```ignore
    /// assert_eq!(Stage::LoadConfig.next(), Some(Stage::FetchArticles));
    /// assert_eq!(Stage::Done.next(), None);
    /// ```
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::LoadConfig => Some(Stage::FetchArticles),
            Stage::FetchArticles => Some(Stage::ScrapeArticles),
            Stage::ScrapeArticles => Some(Stage::GenerateReport),
            Stage::GenerateReport => Some(Stage::Done),
            Stage::Done => None,
        }
    }

    /// One-line description used as the flowchart label.
    pub fn describe(self) -> &'static str {
        match self {
            Stage::LoadConfig => "Read report metadata and feed list",
            Stage::FetchArticles => "Collect entry links from every feed",
            Stage::ScrapeArticles => "Extract readable text from each article",
            Stage::GenerateReport => "Write sections and save the report",
            Stage::Done => "Report written",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::LoadConfig => "load_config",
            Stage::FetchArticles => "fetch_articles",
            Stage::ScrapeArticles => "scrape_articles",
            Stage::GenerateReport => "generate_report",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub feeds: usize,
    pub urls: usize,
    pub articles: usize,
    /// Sections with their generated content, in configuration order.
    pub sections: Vec<SectionSpec>,
    pub output: PathBuf,
}

/// A stage together with the data it consumes.
enum Step {
    LoadConfig,
    FetchArticles {
        config: ReportConfig,
        feeds: FeedList,
    },
    ScrapeArticles {
        config: ReportConfig,
        feeds: usize,
        urls: Vec<String>,
    },
    GenerateReport {
        config: ReportConfig,
        feeds: usize,
        urls: usize,
        articles: Vec<String>,
    },
    Done(RunSummary),
}

impl Step {
    fn stage(&self) -> Stage {
        match self {
            Step::LoadConfig => Stage::LoadConfig,
            Step::FetchArticles { .. } => Stage::FetchArticles,
            Step::ScrapeArticles { .. } => Stage::ScrapeArticles,
            Step::GenerateReport { .. } => Stage::GenerateReport,
            Step::Done(_) => Stage::Done,
        }
    }
}

/// The four-stage report pipeline over injected capabilities.
pub struct ReportPipeline<F, S, W> {
    feeds: F,
    scraper: S,
    writer: W,
    policy: FailurePolicy,
    paths: ReportPaths,
}

impl<F, S, W> ReportPipeline<F, S, W>
where
    F: FeedSource,
    S: ArticleSource,
    W: SectionWriter,
{
    /// Create a pipeline. Nothing is read or fetched until [`run`](Self::run).
    ///
    /// # Arguments
    ///
    /// * `feeds` - Turns a feed URL into its first entry links
    /// * `scraper` - Turns an article URL into readable text
    /// * `writer` - Writes one section from the aggregated article text
    /// * `policy` - Whether feed and scrape failures skip the input or abort
    /// * `paths` - The two input files and the report destination
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = scrapers::http_client()?;
    /// let pipeline = ReportPipeline::new(
    ///     HttpFeedSource::new(client.clone()),
    ///     HttpArticleSource::new(client),
    ///     LlmSectionWriter::new(ask),
    ///     FailurePolicy::default(),
    ///     args.paths(),
    /// );
    /// ```
    pub fn new(feeds: F, scraper: S, writer: W, policy: FailurePolicy, paths: ReportPaths) -> Self {
        Self {
            feeds,
            scraper,
            writer,
            policy,
            paths,
        }
    }

    /// Walk every stage in order and write the report.
    ///
    /// `LoadConfig` reads both input files and then checks that the report
    /// directory is writable, so a missing or malformed input never leaves an
    /// output directory behind. No network request happens before that stage
    /// succeeds.
    ///
    /// # Returns
    ///
    /// A [`RunSummary`] with the counts of each stage and the written sections.
    ///
    /// # Errors
    ///
    /// * [`ReportError::ConfigRead`] / [`ReportError::ConfigParse`] for the input files
    /// * [`ReportError::Feed`] / [`ReportError::Scrape`] when the policy says `abort`
    /// * [`ReportError::Generation`] for the first section that fails
    /// * [`ReportError::Output`] when the report cannot be written
    ///
    /// Any error leaves a previously written report untouched.
    #[instrument(level = "info", skip_all, fields(output = %self.paths.output.display()))]
    pub async fn run(&self) -> Result<RunSummary, ReportError> {
        let started = Instant::now();
        let mut step = Step::LoadConfig;

        loop {
            let stage = step.stage();
            info!(%stage, "Entering stage");
            step = match step {
                Step::LoadConfig => {
                    let config = load_report_config(&self.paths.report_meta).await?;
                    let feeds = load_feed_list(&self.paths.feeds).await?;
                    ensure_writable_parent(&self.paths.output)
                        .await
                        .map_err(|source| ReportError::Output {
                            path: self.paths.output.clone(),
                            source,
                        })?;
                    info!(
                        topic = %config.topic,
                        audience_level = %config.audience_level,
                        "Creating report"
                    );
                    Step::FetchArticles { config, feeds }
                }
                Step::FetchArticles { config, feeds } => {
                    let urls = self.fetch_urls(&feeds, config.articles_per_feed).await?;
                    Step::ScrapeArticles {
                        config,
                        feeds: feeds.rss_feeds.len(),
                        urls,
                    }
                }
                Step::ScrapeArticles { config, feeds, urls } => {
                    let articles = self.scrape_all(&urls).await?;
                    Step::GenerateReport {
                        config,
                        feeds,
                        urls: urls.len(),
                        articles,
                    }
                }
                Step::GenerateReport {
                    config,
                    feeds,
                    urls,
                    articles,
                } => {
                    let source_text = articles.iter().join("\n");
                    let config = generate_sections(config, &source_text, &self.writer).await?;
                    let body = render_report(&config);
                    write_report(&self.paths.output, &body).await?;
                    Step::Done(RunSummary {
                        feeds,
                        urls,
                        articles: articles.len(),
                        sections: config.sections,
                        output: self.paths.output.clone(),
                    })
                }
                Step::Done(summary) => {
                    info!(
                        feeds = summary.feeds,
                        urls = summary.urls,
                        articles = summary.articles,
                        sections = summary.sections.len(),
                        elapsed_ms = started.elapsed().as_millis(),
                        path = %summary.output.display(),
                        "Complete report compiled and saved"
                    );
                    return Ok(summary);
                }
            };
            debug_assert_eq!(Some(step.stage()), stage.next());
        }
    }

    async fn fetch_urls(&self, feeds: &FeedList, limit: usize) -> Result<Vec<String>, ReportError> {
        let mut urls = Vec::new();

        for feed_url in &feeds.rss_feeds {
            match self.feeds.entry_links(feed_url, limit).await {
                Ok(links) => {
                    info!(feed = %feed_url, count = links.len(), "Fetched article URLs");
                    urls.extend(links);
                }
                Err(e) => match self.policy.on_feed_error {
                    OnError::Skip => {
                        warn!(feed = %feed_url, error = %e, "Feed unavailable; contributing no articles");
                    }
                    OnError::Abort => {
                        error!(feed = %feed_url, error = %e, "Feed unavailable; aborting");
                        return Err(ReportError::Feed {
                            url: feed_url.clone(),
                            reason: e.to_string(),
                        });
                    }
                },
            }
        }

        info!(count = urls.len(), "Collected article URLs");
        Ok(urls)
    }

    async fn scrape_all(&self, urls: &[String]) -> Result<Vec<String>, ReportError> {
        let mut articles = Vec::with_capacity(urls.len());

        for url in urls {
            match self.scraper.scrape(url).await {
                Ok(text) => {
                    debug!(%url, bytes = text.len(), "Scraped article");
                    articles.push(text);
                }
                Err(e) => match self.policy.on_scrape_error {
                    OnError::Skip => {
                        warn!(%url, error = %e, "Scrape failed; skipping article");
                    }
                    OnError::Abort => {
                        error!(%url, error = %e, "Scrape failed; aborting");
                        return Err(ReportError::Scrape {
                            url: url.clone(),
                            reason: e.to_string(),
                        });
                    }
                },
            }
        }

        info!(count = articles.len(), "Scraped articles");
        Ok(articles)
    }
}
