use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::{DigestError, FetchConfig, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

/// Plain HTTP GET used by every source adapter. Implementations retry
/// transient failures themselves; an `Err` means the endpoint is given up.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String>;
}

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        let policy = RetryPolicy::new(
            config.max_attempts,
            Duration::from_secs(config.retry_delay_seconds),
        );

        Ok(Self { client, config, policy })
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(DigestError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(content_length) = response.content_length() {
            let size_mb = content_length as usize / (1024 * 1024);
            if size_mb > self.config.max_feed_size_mb {
                return Err(DigestError::FeedTooLarge { size_mb });
            }
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl HttpFetch for Fetcher {
    async fn get_text(&self, url: &str) -> Result<String> {
        Url::parse(url)?;
        debug!("Fetching: {}", url);

        let start_time = Instant::now();
        let body = retry_with_backoff(&self.policy, url, || self.fetch_once(url)).await?;

        info!(
            "Fetched {} ({} bytes in {} ms)",
            url,
            body.len(),
            start_time.elapsed().as_millis()
        );
        Ok(body)
    }
}
