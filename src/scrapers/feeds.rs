//! RSS and Atom feed indexing.
//!
//! Feeds are read top to bottom and the first `limit` entries are kept in
//! document order. No date sorting happens: "latest" is whatever order the
//! publisher chose.
//!
//! # Link Selection
//!
//! | Format | Element | Rule |
//! |--------|---------|------|
//! | RSS 2.0 | `<item><link>` | text content |
//! | RSS 2.0 | `<item><guid>` | fallback when no `<link>`, unless `isPermaLink="false"` |
//! | Atom | `<entry><link href>` | first link with `rel="alternate"` or no `rel` |

use crate::pipeline::FeedSource;
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use reqwest::Client;
use std::error::Error;
use tracing::{debug, info, instrument};
use url::Url;

/// Feed source backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl FeedSource for HttpFeedSource {
    async fn entry_links(&self, feed_url: &str, limit: usize) -> Result<Vec<String>, Box<dyn Error>> {
        fetch_article_urls(&self.client, feed_url, limit).await
    }
}

/// Download a feed and return the links of its first `limit` entries.
///
/// # Errors
///
/// Returns an error if the request fails, the server answers with a
/// non-success status, or the document is not well-formed XML.
#[instrument(level = "info", skip(client))]
pub async fn fetch_article_urls(
    client: &Client,
    feed_url: &str,
    limit: usize,
) -> Result<Vec<String>, Box<dyn Error>> {
    if limit == 0 {
        debug!("Limit is zero; skipping request");
        return Ok(Vec::new());
    }

    let body = client
        .get(feed_url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    let base = Url::parse(feed_url).ok();
    let urls = parse_entry_links(&body, base.as_ref(), limit)?;

    info!(count = urls.len(), "Indexed feed entry links");
    debug!(urls = ?urls, "Feed entry links");
    Ok(urls)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Capture {
    Link,
    Guid,
}

/// Links collected for the entry currently being read.
#[derive(Debug, Default)]
struct EntryLinks {
    link: Option<String>,
    guid: Option<String>,
    guid_is_permalink: bool,
}

impl EntryLinks {
    fn resolve(self) -> Option<String> {
        let link = self.link.filter(|l| !l.is_empty());
        let guid = self
            .guid
            .filter(|g| self.guid_is_permalink && (g.starts_with("http://") || g.starts_with("https://")));
        link.or(guid)
    }
}

/// Extract entry links from an RSS or Atom document.
///
/// Only the first `limit` entries are considered; entries without a usable
/// link are skipped, so fewer than `limit` links may come back. Relative
/// links are resolved against `base` when given.
pub fn parse_entry_links(
    xml: &str,
    base: Option<&Url>,
    limit: usize,
) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);

    let mut links = Vec::new();
    let mut entries_seen = 0usize;
    let mut entry: Option<EntryLinks> = None;
    let mut capture: Option<Capture> = None;
    let mut buf = String::new();

    if limit == 0 {
        return Ok(links);
    }

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"item" | b"entry" => {
                    entry = Some(EntryLinks::default());
                    capture = None;
                }
                b"link" => {
                    if let Some(current) = entry.as_mut() {
                        if attr_value(&e, b"href").is_some() {
                            if let Some(href) = atom_href(&e) {
                                current.link.get_or_insert(href);
                            }
                        } else if current.link.is_none() {
                            capture = Some(Capture::Link);
                            buf.clear();
                        }
                    }
                }
                b"guid" => {
                    if let Some(current) = entry.as_mut() {
                        current.guid_is_permalink = attr_value(&e, b"isPermaLink")
                            .map(|v| !v.eq_ignore_ascii_case("false"))
                            .unwrap_or(true);
                        capture = Some(Capture::Guid);
                        buf.clear();
                    }
                }
                _ => {}
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"link" {
                    if let (Some(current), Some(href)) = (entry.as_mut(), atom_href(&e)) {
                        current.link.get_or_insert(href);
                    }
                }
            }
            Event::Text(e) => {
                if capture.is_some() {
                    let raw = String::from_utf8_lossy(&e);
                    match unescape(&raw) {
                        Ok(text) => buf.push_str(&text),
                        Err(_) => buf.push_str(&raw),
                    }
                }
            }
            Event::GeneralRef(e) => {
                if capture.is_some() {
                    let reference = format!("&{};", String::from_utf8_lossy(&e));
                    match unescape(&reference) {
                        Ok(text) => buf.push_str(&text),
                        Err(_) => buf.push_str(&reference),
                    }
                }
            }
            Event::CData(e) => {
                if capture.is_some() {
                    buf.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"link" | b"guid" => {
                    if let (Some(kind), Some(current)) = (capture.take(), entry.as_mut()) {
                        let value = buf.trim().to_string();
                        match kind {
                            Capture::Link => current.link = Some(value),
                            Capture::Guid => current.guid = Some(value),
                        }
                    }
                }
                b"item" | b"entry" => {
                    if let Some(finished) = entry.take() {
                        entries_seen += 1;
                        match finished.resolve() {
                            Some(link) => links.push(resolve_link(base, link)),
                            None => debug!(entry = entries_seen, "Feed entry has no usable link"),
                        }
                        if entries_seen >= limit {
                            break;
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(links)
}

/// The `href` of an Atom `<link>` element, if it points at the entry itself.
fn atom_href(e: &BytesStart<'_>) -> Option<String> {
    let href = attr_value(e, b"href")?;
    match attr_value(e, b"rel").as_deref() {
        None | Some("alternate") => Some(href),
        Some(_) => None,
    }
}

fn attr_value(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .map(|a| {
            let raw = String::from_utf8_lossy(&a.value).into_owned();
            match unescape(&raw) {
                Ok(value) => value.into_owned(),
                Err(_) => raw,
            }
        })
}

fn resolve_link(base: Option<&Url>, link: String) -> String {
    match base.map(|b| b.join(&link)) {
        Some(Ok(resolved)) => resolved.to_string(),
        _ => link,
    }
}
