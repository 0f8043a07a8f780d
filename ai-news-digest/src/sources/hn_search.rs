use crate::config::SearchApiSpec;
use crate::fetcher::HttpFetch;
use crate::traits::PullSource;
use crate::types::{Article, DigestError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

const ITEM_URL: &str = "https://news.ycombinator.com/item?id=";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "objectID")]
    object_id: String,
    title: Option<String>,
    url: Option<String>,
    points: Option<i64>,
    created_at_i: Option<i64>,
}

/// Hacker News stories from the Algolia search API.
///
/// Every query is issued with a server-side recency filter; hits are then
/// re-checked against the window, held to a minimum score, de-duplicated by
/// item id across queries and sorted by points before the cap is applied.
pub struct HackerNewsSearch {
    spec: SearchApiSpec,
    now: Option<DateTime<Utc>>,
}

impl HackerNewsSearch {
    pub fn new(spec: SearchApiSpec) -> Self {
        Self { spec, now: None }
    }

    /// Pins the clock used for the recency window.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    fn cutoff(&self) -> i64 {
        let now = self.now.unwrap_or_else(Utc::now);
        (now - Duration::hours(self.spec.lookback_hours)).timestamp()
    }

    pub fn search_url(&self, query: &str, cutoff: i64) -> Result<String> {
        let url = Url::parse_with_params(
            &self.spec.base_url,
            &[
                ("query", query.to_string()),
                ("tags", "story".to_string()),
                ("hitsPerPage", self.spec.hits_per_query.to_string()),
                ("numericFilters", format!("created_at_i>{}", cutoff)),
            ],
        )?;
        Ok(url.to_string())
    }

    async fn run_query(&self, fetch: &dyn HttpFetch, query: &str, cutoff: i64) -> Result<Vec<SearchHit>> {
        let url = self.search_url(query, cutoff)?;
        let body = fetch.get_text(&url).await?;
        let response: SearchResponse = serde_json::from_str(&body)?;
        debug!("{}: query {:?} returned {} hits", self.spec.name, query, response.hits.len());
        Ok(response.hits)
    }

    fn to_article(&self, hit: &SearchHit, query: &str) -> Option<Article> {
        let title = hit.title.as_deref()?;
        let link = match hit.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => format!("{}{}", ITEM_URL, hit.object_id),
        };
        let points = hit.points.unwrap_or(0);

        let mut article = Article::new(title, &link, &self.spec.name)?
            .with_tag(query)
            .with_score(points);
        if let Some(ts) = hit.created_at_i.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)) {
            article = article.with_published(&ts.to_rfc3339());
        }
        Some(article)
    }
}

#[async_trait]
impl PullSource for HackerNewsSearch {
    fn source_name(&self) -> String {
        self.spec.name.clone()
    }

    async fn pull(&self, fetch: &dyn HttpFetch) -> Result<Vec<Article>> {
        let cutoff = self.cutoff();
        let mut seen_ids = HashSet::new();
        let mut articles = Vec::new();
        let mut failed_queries = 0;

        for query in &self.spec.queries {
            let hits = match self.run_query(fetch, query, cutoff).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!("{}: query {:?} failed: {}", self.spec.name, query, e);
                    failed_queries += 1;
                    continue;
                }
            };

            for hit in hits {
                if hit.created_at_i.is_some_and(|ts| ts <= cutoff) {
                    continue;
                }
                if hit.points.unwrap_or(0) < self.spec.min_points {
                    continue;
                }
                if !seen_ids.insert(hit.object_id.clone()) {
                    continue;
                }
                articles.extend(self.to_article(&hit, query));
            }
        }

        if failed_queries == self.spec.queries.len() && !self.spec.queries.is_empty() {
            return Err(DigestError::NoRecords {
                source_name: self.spec.name.clone(),
            });
        }

        // Stable sort keeps first-seen order among equal scores
        articles.sort_by(|a, b| b.score.cmp(&a.score));
        articles.truncate(self.spec.cap);

        info!("{}: {} stories above {} points", self.spec.name, articles.len(), self.spec.min_points);
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapFetch(HashMap<String, String>);

    #[async_trait]
    impl HttpFetch for MapFetch {
        async fn get_text(&self, url: &str) -> Result<String> {
            self.0
                .get(url)
                .cloned()
                .ok_or_else(|| DigestError::Status { status: 503, url: url.to_string() })
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-19T12:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn hit(id: &str, points: i64, age_hours: i64, url: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "objectID": id,
            "title": format!("Story {}", id),
            "url": url,
            "points": points,
            "created_at_i": (now() - Duration::hours(age_hours)).timestamp(),
        })
    }

    #[tokio::test]
    async fn filters_dedupes_and_sorts_hits() {
        let spec = SearchApiSpec {
            queries: vec!["AI".into(), "LLM".into()],
            min_points: 20,
            cap: 3,
            ..SearchApiSpec::default()
        };
        let source = HackerNewsSearch::new(spec).at(now());
        let cutoff = source.cutoff();

        let ai = serde_json::json!({"hits": [
            hit("1", 50, 1, Some("https://a.example/1")),
            hit("2", 5, 1, Some("https://a.example/2")),
            hit("3", 300, 72, Some("https://a.example/3")),
            hit("4", 90, 2, None),
        ]});
        let llm = serde_json::json!({"hits": [
            hit("1", 50, 1, Some("https://a.example/1")),
            hit("5", 70, 3, Some("https://a.example/5")),
            hit("6", 21, 3, Some("https://a.example/6")),
        ]});
        let fetch = MapFetch(HashMap::from([
            (source.search_url("AI", cutoff).unwrap(), ai.to_string()),
            (source.search_url("LLM", cutoff).unwrap(), llm.to_string()),
        ]));

        let articles = source.pull(&fetch).await.unwrap();
        let ids: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(ids, vec!["Story 4", "Story 5", "Story 1"]);
        assert_eq!(articles[0].link, "https://news.ycombinator.com/item?id=4");
        assert_eq!(articles[0].score, Some(90));
        assert_eq!(articles[1].source_tag, "LLM");
    }

    #[tokio::test]
    async fn all_queries_failing_is_a_source_failure() {
        let source = HackerNewsSearch::new(SearchApiSpec::default()).at(now());
        let err = source.pull(&MapFetch(HashMap::new())).await.unwrap_err();
        assert!(matches!(err, DigestError::NoRecords { .. }));
    }

    #[test]
    fn search_url_carries_the_recency_filter() {
        let source = HackerNewsSearch::new(SearchApiSpec::default());
        let url = source.search_url("machine learning", 1_700_000_000).unwrap();
        assert!(url.starts_with("https://hn.algolia.com/api/v1/search_by_date?query=machine+learning"));
        assert!(url.contains("tags=story"));
        assert!(url.contains("hitsPerPage=50"));
        assert!(url.contains("numericFilters=created_at_i%3E1700000000"));
    }
}
