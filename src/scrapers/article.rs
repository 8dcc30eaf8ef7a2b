//! Readable-text extraction from article pages.
//!
//! Pages are fetched once, parsed with `scraper`, and reduced to the text of
//! their primary container. Only the subtree below that container is
//! inspected, so wrappers above it never hide its text. Scripts, navigation
//! and form controls are dropped wherever they appear. A `<form>` itself is
//! kept, since ASP.NET pages wrap their whole body in one. Headers, footers
//! and asides are dropped only when extracting from `<body>`, where they are
//! page chrome rather than part of an article.
//! Whitespace is collapsed so every block of text ends up on its own line.

use crate::pipeline::ArticleSource;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Node, Selector};
use std::error::Error;
use tracing::{debug, info, instrument, warn};

/// Containers tried in order; the first one with any text wins.
static CONTAINER_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["article", "main", "[role=main]", "body"]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
});

static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\x{a0}]+").expect("valid regex"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n+").expect("valid regex"));

/// Elements whose text never belongs to the article body.
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "nav", "button", "select", "textarea",
];

/// Page chrome, skipped only when the whole `<body>` is the container.
/// Inside `<article>` or `<main>` a `<header>` usually holds the headline.
const CHROME_ELEMENTS: &[&str] = &["header", "footer", "aside"];

/// Elements that start a new line in the extracted text.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "section", "li", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "br",
    "tr", "figcaption", "header", "footer", "aside",
];

/// Article source backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpArticleSource {
    client: Client,
}

impl HttpArticleSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl ArticleSource for HttpArticleSource {
    async fn scrape(&self, url: &str) -> Result<String, Box<dyn Error>> {
        scrape_article(&self.client, url).await
    }
}

/// Fetch a single article and return its readable text.
///
/// # Errors
///
/// Returns an error if the request fails or the server answers with a
/// non-success status. A page without any extractable text is not an error;
/// it yields an empty string.
#[instrument(level = "info", skip(client))]
pub async fn scrape_article(client: &Client, url: &str) -> Result<String, Box<dyn Error>> {
    let body = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let text = extract_main_text(&body);
    if text.is_empty() {
        warn!("Article page produced no text");
    } else {
        info!(bytes = text.len(), "Parsed article");
    }
    Ok(text)
}

/// Reduce an HTML document to the text of its primary container.
pub fn extract_main_text(html: &str) -> String {
    let document = Html::parse_document(html);

    for selector in CONTAINER_SELECTORS.iter() {
        if let Some(container) = document.select(selector).next() {
            let text = container_text(container);
            if !text.is_empty() {
                debug!(container = container.value().name(), "Selected content container");
                return text;
            }
        }
    }
    String::new()
}

fn container_text(container: ElementRef<'_>) -> String {
    let root = *container;
    let skip_chrome = container.value().name() == "body";
    let is_skipped = |name: &str| {
        SKIPPED_ELEMENTS.contains(&name) || (skip_chrome && CHROME_ELEMENTS.contains(&name))
    };
    let mut raw = String::new();

    for node in root.descendants().skip(1) {
        // Ancestors above the container are not part of the decision.
        let skipped = std::iter::once(node)
            .chain(node.ancestors())
            .take_while(|a| a.id() != root.id())
            .any(|a| a.value().as_element().is_some_and(|e| is_skipped(e.name())));
        if skipped {
            continue;
        }

        match node.value() {
            Node::Text(text) => raw.push_str(text),
            Node::Element(e) if BLOCK_ELEMENTS.contains(&e.name()) => raw.push('\n'),
            _ => {}
        }
    }

    normalize_whitespace(&raw)
}

/// Collapse runs of spaces, trim every line and squeeze blank lines.
pub fn normalize_whitespace(raw: &str) -> String {
    let spaced = SPACES.replace_all(raw, " ");
    let lines = spaced
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    BLANK_LINES.replace_all(lines.trim(), "\n").into_owned()
}
