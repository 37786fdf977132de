use crate::types::{Error, FetchConfig, Result};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Boundary for raw feed retrieval, so the pipeline can be exercised
/// without the network.
#[async_trait]
pub trait FetchContent: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// HTTP retrieval for upstream feeds: bounded retries with exponential
/// backoff, a per-request timeout, and an identifying client header. Holds
/// no state beyond the reqwest client; parsing happens elsewhere.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .map_err(Error::Http)?;

        Ok(Self { client, config })
    }

    async fn attempt(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::General(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl FetchContent for Fetcher {
    /// Fetch the raw body of one source URL. Retries connection-level
    /// failures up to `max_retries` times; a non-success status after the
    /// final attempt is an error for this source only.
    async fn fetch(&self, url: &str) -> Result<String> {
        let parsed = url::Url::parse(url)?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::General(format!("unsupported URL scheme: {url}")));
        }

        debug!("Fetching {}", url);

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 32),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.retry_delay_seconds * 60)),
            ..Default::default()
        };

        let mut last_error: Option<Error> = None;

        // Every failure mode (connect, bad status, body read) goes through
        // the same paced retry path.
        for attempt in 0..=self.config.max_retries {
            match self.attempt(url).await {
                Ok(body) => {
                    info!("Fetched {} ({} bytes)", url, body.len());
                    return Ok(body);
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        if let Some(delay) = backoff.next_backoff() {
                            warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, url, delay);
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::General(format!("fetch failed: {url}"))))
    }
}
