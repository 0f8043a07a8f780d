use crate::config::FeedSpec;
use crate::fetcher::HttpFetch;
use crate::parser::FeedParser;
use crate::traits::PullSource;
use crate::types::{Article, DigestError, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// RSS/Atom source with ordered fallback endpoints.
///
/// Endpoints are tried in order and the first one that parses to at least
/// one record wins; the remaining endpoints are not contacted.
pub struct FeedSource {
    spec: FeedSpec,
}

impl FeedSource {
    pub fn new(spec: FeedSpec) -> Self {
        Self { spec }
    }

    async fn try_endpoint(&self, fetch: &dyn HttpFetch, url: &str) -> Result<Vec<Article>> {
        let body = fetch.get_text(url).await?;
        FeedParser::parse_articles(&body, &self.spec.name, &self.spec.tag)
    }
}

#[async_trait]
impl PullSource for FeedSource {
    fn source_name(&self) -> String {
        self.spec.name.clone()
    }

    fn trusted(&self) -> bool {
        self.spec.trusted
    }

    async fn pull(&self, fetch: &dyn HttpFetch) -> Result<Vec<Article>> {
        for url in &self.spec.urls {
            match self.try_endpoint(fetch, url).await {
                Ok(mut articles) if !articles.is_empty() => {
                    articles.truncate(self.spec.cap);
                    info!("{}: {} articles from {}", self.spec.name, articles.len(), url);
                    return Ok(articles);
                }
                Ok(_) => debug!("{}: {} returned no records", self.spec.name, url),
                Err(e) => warn!("{}: endpoint {} failed: {}", self.spec.name, url, e),
            }
        }

        Err(DigestError::NoRecords {
            source_name: self.spec.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MapFetch {
        pages: HashMap<String, String>,
        hits: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpFetch for MapFetch {
        async fn get_text(&self, url: &str) -> Result<String> {
            self.hits.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| DigestError::Status { status: 404, url: url.to_string() })
        }
    }

    fn rss(n: usize) -> String {
        let items: String = (1..=n)
            .map(|i| format!("<item><title>Story {i}</title><link>https://n.example/{i}</link></item>"))
            .collect();
        format!(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>x</title>{items}</channel></rss>"#)
    }

    #[tokio::test]
    async fn first_successful_endpoint_wins() {
        let fetch = MapFetch {
            pages: HashMap::from([
                ("https://b.example/feed".to_string(), rss(3)),
                ("https://c.example/feed".to_string(), rss(5)),
            ]),
            hits: Mutex::new(Vec::new()),
        };
        let source = FeedSource::new(FeedSpec::new(
            "Letter",
            &["https://a.example/feed", "https://b.example/feed", "https://c.example/feed"],
            2,
            true,
        ));

        let articles = source.pull(&fetch).await.unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].source, "Letter");
        assert_eq!(
            *fetch.hits.lock().unwrap(),
            vec!["https://a.example/feed", "https://b.example/feed"]
        );
    }

    #[tokio::test]
    async fn empty_feeds_fall_through_to_no_records() {
        let fetch = MapFetch {
            pages: HashMap::from([("https://a.example/feed".to_string(), rss(0))]),
            hits: Mutex::new(Vec::new()),
        };
        let source = FeedSource::new(FeedSpec::new("Quiet", &["https://a.example/feed"], 10, false));
        let err = source.pull(&fetch).await.unwrap_err();
        assert!(matches!(err, DigestError::NoRecords { .. }));
    }
}
