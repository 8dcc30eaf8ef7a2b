//! Client for the OpenAI-compatible model that writes report sections.
//!
//! - [`AskAsync`]: one prompt in, one completion out
//! - [`AskFnWrapper`]: adapts `awful_aj::api::ask` with a loaded config and chat template
//! - [`RetryAsk`]: optional exponential backoff around any [`AskAsync`]
//!
//! Retries are off unless `--generation-retries` is raised: a single failed
//! call aborts the run.

use awful_aj::api::ask;
use awful_aj::{config::AwfulJadeConfig, template::ChatTemplate};
use rand::{Rng, rng};
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Maximum random jitter added to every backoff delay.
const MAX_JITTER_MS: u64 = 250;

/// Send a prompt to a model and receive its completion.
pub trait AskAsync {
    type Response;

    /// Send `text` to the model.
    ///
    /// # Arguments
    ///
    /// * `text` - The complete user message, already rendered
    ///
    /// # Returns
    ///
    /// The model's completion, or the transport/API error.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Exponential backoff decorator for any [`AskAsync`] implementation.
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + jitter(0..=250ms)
/// ```
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Wrap `inner` with backoff retries.
    ///
    /// # Arguments
    ///
    /// * `inner` - The client to call
    /// * `max_retries` - Extra attempts after the first; `0` means exactly one attempt
    /// * `base_delay` - Delay before the first retry, doubled for each further one
    ///
    /// # Example
    ///
    /// ```ignore
    /// let ask = AskFnWrapper { config: &llm_config, template: &template };
    /// let retrying = RetryAsk::new(ask, 3, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Delay before retry number `attempt` (1-based), without jitter.
    fn backoff_delay(&self, attempt: usize) -> Duration {
        let shift = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(31);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            let err = match self.inner.ask(text).await {
                Ok(resp) => return Ok(resp),
                Err(e) => e,
            };

            attempt += 1;
            if attempt > self.max_retries {
                if self.max_retries > 0 {
                    error!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_t0.elapsed().as_millis(),
                        error = %err,
                        "ask() exhausted retries"
                    );
                }
                return Err(err);
            }

            let jitter = Duration::from_millis(rng().random_range(0..=MAX_JITTER_MS));
            let delay = self.backoff_delay(attempt) + jitter;
            warn!(
                attempt,
                max = self.max_retries,
                elapsed_ms_attempt = attempt_t0.elapsed().as_millis(),
                ?delay,
                error = %err,
                "ask() attempt failed; backing off"
            );
            sleep(delay).await;
        }
    }
}

/// [`AskAsync`] over `awful_aj`, using a loaded config and chat template.
#[derive(Debug)]
pub struct AskFnWrapper<'a> {
    /// Endpoint, model and credentials.
    pub config: &'a AwfulJadeConfig,
    /// System prompt for the report writer.
    pub template: &'a ChatTemplate,
}

impl AskAsync for AskFnWrapper<'_> {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(prompt_bytes = text.len()))]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(self.config, text.to_string(), self.template, None, None).await;
        let elapsed_ms = t0.elapsed().as_millis();

        match &res {
            Ok(answer) => info!(elapsed_ms, bytes = answer.len(), "API call succeeded"),
            Err(e) => warn!(elapsed_ms, error = %e, "API call failed"),
        }
        res
    }
}

/// Resolve the `awful_aj` config file: an explicit path wins over the
/// default `config.yaml` in the `awful_aj` config directory.
pub fn llm_config_path(explicit: Option<&Path>) -> Result<PathBuf, Box<dyn Error>> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(awful_aj::config_dir()?.join("config.yaml")),
    }
}

/// Load the model config and the named chat template.
///
/// # Arguments
///
/// * `path` - The `awful_aj` YAML config (endpoint, model, API key)
/// * `template_name` - Template looked up in the `awful_aj` templates directory
///
/// # Returns
///
/// The parsed config and template, ready for [`AskFnWrapper`].
#[instrument(level = "info", skip_all, fields(path = %path.display(), template = %template_name))]
pub async fn load_llm(
    path: &Path,
    template_name: &str,
) -> Result<(AwfulJadeConfig, ChatTemplate), Box<dyn Error>> {
    let config_path = path
        .to_str()
        .ok_or_else(|| format!("config path {} is not valid UTF-8", path.display()))?;
    let config = awful_aj::config::load_config(config_path)?;
    info!("Loaded model configuration");

    let template = awful_aj::template::load_template(template_name).await?;
    info!("Loaded chat template");

    Ok((config, template))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Fails the first `failures` calls, then echoes the prompt.
    #[derive(Debug)]
    struct Flaky {
        failures: usize,
        calls: Cell<usize>,
    }

    impl AskAsync for Flaky {
        type Response = String;

        async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>> {
            let n = self.calls.get();
            self.calls.set(n + 1);
            if n < self.failures {
                Err(format!("transient failure {n}").into())
            } else {
                Ok(text.to_uppercase())
            }
        }
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let api = RetryAsk::new(
            Flaky {
                failures: 1,
                calls: Cell::new(0),
            },
            0,
            Duration::from_millis(1),
        );

        let err = api.ask("hello").await.unwrap_err();
        assert_eq!(err.to_string(), "transient failure 0");
        assert_eq!(api.inner.calls.get(), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failure() {
        let api = RetryAsk::new(
            Flaky {
                failures: 1,
                calls: Cell::new(0),
            },
            2,
            Duration::from_millis(1),
        );

        assert_eq!(api.ask("hello").await.unwrap(), "HELLO");
        assert_eq!(api.inner.calls.get(), 2);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let api = RetryAsk::new(
            Flaky {
                failures: 0,
                calls: Cell::new(0),
            },
            10,
            Duration::from_secs(1),
        );

        assert_eq!(api.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(api.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(api.backoff_delay(5), Duration::from_secs(16));
        assert_eq!(api.backoff_delay(6), Duration::from_secs(30));
        assert_eq!(api.backoff_delay(200), Duration::from_secs(30));
    }

    #[test]
    fn test_explicit_llm_config_path_wins() {
        let path = llm_config_path(Some(Path::new("/etc/report/config.yaml"))).unwrap();
        assert_eq!(path, PathBuf::from("/etc/report/config.yaml"));
    }
}
