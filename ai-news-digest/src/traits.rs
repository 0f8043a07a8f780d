use crate::fetcher::HttpFetch;
use crate::types::{Article, Result};
use async_trait::async_trait;

/// A named source of raw articles (feed, search API, subreddit set).
#[async_trait]
pub trait PullSource: Send + Sync {
    /// Human-readable name, also the key of the crawl log's source breakdown
    fn source_name(&self) -> String;

    /// Trusted sources are wholly in-domain and bypass the relevance filter
    fn trusted(&self) -> bool {
        false
    }

    /// Fetch this source's current articles, already capped.
    /// An `Err` means the whole source yielded nothing usable.
    async fn pull(&self, fetch: &dyn HttpFetch) -> Result<Vec<Article>>;
}
