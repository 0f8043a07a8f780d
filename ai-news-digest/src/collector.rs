use crate::fetcher::HttpFetch;
use crate::traits::PullSource;
use crate::types::Article;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{error, info};

/// Everything one collection pass produced.
#[derive(Debug, Default)]
pub struct CollectionReport {
    pub articles: Vec<Article>,
    /// Article count per source name; failed sources are recorded as 0
    pub breakdown: BTreeMap<String, usize>,
    pub trusted_sources: BTreeSet<String>,
}

/// Pulls every configured source in order, one at a time.
/// A failing source contributes nothing and never aborts the pass.
pub struct SourceCollector {
    sources: Vec<Box<dyn PullSource>>,
}

impl SourceCollector {
    pub fn new(sources: Vec<Box<dyn PullSource>>) -> Self {
        Self { sources }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub async fn collect(&self, fetch: &dyn HttpFetch) -> CollectionReport {
        let mut report = CollectionReport::default();

        for source in &self.sources {
            let name = source.source_name();
            if source.trusted() {
                report.trusted_sources.insert(name.clone());
            }

            let pulled = match source.pull(fetch).await {
                Ok(articles) => articles,
                Err(e) => {
                    error!("Source {} failed: {}", name, e);
                    Vec::new()
                }
            };

            *report.breakdown.entry(name).or_insert(0) += pulled.len();
            report.articles.extend(pulled);
        }

        info!(
            "Collected {} articles from {} sources",
            report.articles.len(),
            self.sources.len()
        );
        report
    }
}
