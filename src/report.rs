//! Section generation.
//!
//! Every section is written from the same aggregated article text. Sections
//! are processed strictly in configuration order and each result only
//! touches its own section.

use crate::api::AskAsync;
use crate::error::ReportError;
use crate::models::ReportConfig;
use crate::utils::truncate_for_log;
use std::error::Error;
use std::fmt;
use tracing::{debug, error, info, instrument};

/// Structured input for writing one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionRequest<'a> {
    pub section_title: &'a str,
    pub section_description: &'a str,
    pub audience_level: &'a str,
    pub source_text: &'a str,
}

impl SectionRequest<'_> {
    /// Render the request as a single user message for a chat model.
    pub fn to_prompt(&self) -> String {
        format!(
            "Write the \"{title}\" section of a market research report.\n\
             Section focus: {description}\n\
             Audience level: {audience}\n\
             Base the section only on the source material below. Write in Markdown \
             without repeating the section title as a heading.\n\n\
             ### Source material\n\n{source}",
            title = self.section_title,
            description = self.section_description,
            audience = self.audience_level,
            source = self.source_text,
        )
    }
}

/// Text-generation capability that writes one report section.
pub trait SectionWriter {
    async fn write_section(&self, request: &SectionRequest<'_>) -> Result<String, Box<dyn Error>>;
}

/// [`SectionWriter`] that forwards the rendered prompt to an LLM client.
pub struct LlmSectionWriter<T> {
    inner: T,
}

impl<T> LlmSectionWriter<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

impl<T: fmt::Debug> fmt::Debug for LlmSectionWriter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSectionWriter")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<T> SectionWriter for LlmSectionWriter<T>
where
    T: AskAsync<Response = String>,
{
    async fn write_section(&self, request: &SectionRequest<'_>) -> Result<String, Box<dyn Error>> {
        self.inner.ask(&request.to_prompt()).await
    }
}

/// Write every section of `config` and return the config with content filled in.
///
/// # Arguments
///
/// * `config` - Report metadata; its sections are processed in order
/// * `source_text` - Aggregated article text, passed unchanged to every section
/// * `writer` - The text-generation capability
///
/// # Returns
///
/// A new [`ReportConfig`] whose sections carry their generated content.
///
/// # Example
///
/// ```ignore
/// let config = generate_sections(config, &articles.join("\n"), &writer).await?;
/// let body = render_report(&config);
/// ```
///
/// # Errors
///
/// The first failing section aborts the run with [`ReportError::Generation`];
/// sections after it are not attempted.
#[instrument(level = "info", skip_all, fields(sections = config.sections.len(), source_bytes = source_text.len()))]
pub async fn generate_sections<W: SectionWriter>(
    config: ReportConfig,
    source_text: &str,
    writer: &W,
) -> Result<ReportConfig, ReportError> {
    let mut written = Vec::with_capacity(config.sections.len());

    for (index, section) in config.sections.iter().enumerate() {
        info!(index, title = %section.title, "Processing section");
        let request = SectionRequest {
            section_title: &section.title,
            section_description: &section.description,
            audience_level: &config.audience_level,
            source_text,
        };

        let content = writer.write_section(&request).await.map_err(|e| {
            error!(index, title = %section.title, error = %e, "Section generation failed");
            ReportError::Generation {
                section: section.title.clone(),
                reason: e.to_string(),
            }
        })?;

        debug!(index, preview = %truncate_for_log(&content, 200), "Section content");
        info!(
            index,
            title = %section.title,
            bytes = content.len(),
            lines = content.lines().count(),
            "Section completed"
        );
        written.push(content);
    }

    Ok(written
        .into_iter()
        .enumerate()
        .fold(config, |config, (index, content)| {
            config.with_section_content(index, content)
        }))
}
