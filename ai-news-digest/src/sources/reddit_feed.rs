use crate::config::SubredditSpec;
use crate::fetcher::HttpFetch;
use crate::parser::FeedParser;
use crate::traits::PullSource;
use crate::types::{Article, DigestError, Result};
use async_trait::async_trait;
use tracing::{info, warn};

/// Daily top posts of a set of subreddits, one Atom feed per community.
pub struct SubredditFeeds {
    spec: SubredditSpec,
}

impl SubredditFeeds {
    pub fn new(spec: SubredditSpec) -> Self {
        Self { spec }
    }

    pub fn feed_url(&self, community: &str) -> String {
        format!(
            "{}/r/{}/top/.rss?t=day&limit={}",
            self.spec.base_url.trim_end_matches('/'),
            community,
            self.spec.limit
        )
    }
}

#[async_trait]
impl PullSource for SubredditFeeds {
    fn source_name(&self) -> String {
        self.spec.name.clone()
    }

    async fn pull(&self, fetch: &dyn HttpFetch) -> Result<Vec<Article>> {
        let mut articles = Vec::new();
        let mut failures = 0;

        for community in &self.spec.communities {
            let tag = format!("r/{}", community);
            let url = self.feed_url(community);

            let parsed = match fetch.get_text(&url).await {
                Ok(body) => FeedParser::parse_articles(&body, &self.spec.name, &tag),
                Err(e) => Err(e),
            };

            match parsed {
                Ok(mut posts) => {
                    posts.truncate(self.spec.cap);
                    info!("{}: {} posts from {}", self.spec.name, posts.len(), tag);
                    articles.extend(posts);
                }
                Err(e) => {
                    warn!("{}: {} failed: {}", self.spec.name, tag, e);
                    failures += 1;
                }
            }
        }

        if failures > 0 && failures == self.spec.communities.len() {
            return Err(DigestError::NoRecords {
                source_name: self.spec.name.clone(),
            });
        }
        Ok(articles)
    }
}
