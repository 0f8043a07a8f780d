use crate::categories::CategoryEntry;
use crate::relevance::default_keywords;
use crate::types::{DigestError, FetchConfig, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// A feed-shaped source with ordered fallback endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSpec {
    pub name: String,
    pub urls: Vec<String>,
    #[serde(default = "default_feed_cap")]
    pub cap: usize,
    /// Trusted sources are wholly in-domain and skip the relevance filter.
    #[serde(default)]
    pub trusted: bool,
    #[serde(default)]
    pub tag: String,
}

fn default_feed_cap() -> usize {
    10
}

impl FeedSpec {
    pub fn new(name: &str, urls: &[&str], cap: usize, trusted: bool) -> Self {
        Self {
            name: name.to_string(),
            urls: urls.iter().map(|u| u.to_string()).collect(),
            cap,
            trusted,
            tag: String::new(),
        }
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = tag.to_string();
        self
    }
}

/// Hacker News (Algolia) search source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchApiSpec {
    pub name: String,
    pub base_url: String,
    pub queries: Vec<String>,
    pub hits_per_query: usize,
    pub lookback_hours: i64,
    pub min_points: i64,
    pub cap: usize,
}

impl Default for SearchApiSpec {
    fn default() -> Self {
        Self {
            name: "Hacker News".to_string(),
            base_url: "https://hn.algolia.com/api/v1/search_by_date".to_string(),
            queries: ["AI", "LLM", "OpenAI", "Anthropic", "machine learning"]
                .iter()
                .map(|q| q.to_string())
                .collect(),
            hits_per_query: 50,
            lookback_hours: 48,
            min_points: 20,
            cap: 15,
        }
    }
}

/// Subreddit feeds, one request per community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubredditSpec {
    pub name: String,
    pub base_url: String,
    pub communities: Vec<String>,
    pub limit: usize,
    pub cap: usize,
}

impl Default for SubredditSpec {
    fn default() -> Self {
        Self {
            name: "Reddit".to_string(),
            base_url: "https://www.reddit.com".to_string(),
            communities: ["MachineLearning", "LocalLLaMA", "OpenAI", "artificial"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            limit: 10,
            cap: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceCatalog {
    pub newsletters: Vec<FeedSpec>,
    pub feeds: Vec<FeedSpec>,
    pub search: Option<SearchApiSpec>,
    pub reddit: Option<SubredditSpec>,
}

impl Default for SourceCatalog {
    fn default() -> Self {
        let newsletters = vec![
            FeedSpec::new("TLDR AI", &["https://tldr.tech/api/rss/ai", "https://bullrich.dev/tldr-rss/ai.rss"], 15, true),
            FeedSpec::new("The Rundown AI", &["https://www.therundown.ai/feed", "https://rss.beehiiv.com/feeds/therundown.xml"], 15, true),
            FeedSpec::new("Ben's Bites", &["https://www.bensbites.com/feed", "https://bensbites.beehiiv.com/feed"], 15, true),
            FeedSpec::new("Import AI", &["https://importai.substack.com/feed", "https://jack-clark.net/feed/"], 10, true),
            FeedSpec::new("Last Week in AI", &["https://lastweekin.ai/feed"], 10, true),
        ];

        let feeds = vec![
            FeedSpec::new("Google News", &["https://news.google.com/rss/search?q=artificial+intelligence+when:1d&hl=en-US&gl=US&ceid=US:en"], 10, false)
                .with_tag("artificial intelligence"),
            FeedSpec::new("Google News", &["https://news.google.com/rss/search?q=AI+startup+OR+AI+model+OR+AI+regulation+when:1d&hl=en-US&gl=US&ceid=US:en"], 10, false)
                .with_tag("startups/models/regulation"),
            FeedSpec::new("TechCrunch", &["https://techcrunch.com/category/artificial-intelligence/feed/"], 10, false),
            FeedSpec::new("The Verge", &["https://www.theverge.com/rss/ai-artificial-intelligence/index.xml"], 10, false),
            FeedSpec::new("Ars Technica", &["https://feeds.arstechnica.com/arstechnica/technology-lab"], 10, false),
            FeedSpec::new("VentureBeat", &["https://venturebeat.com/category/ai/feed/"], 10, false),
            FeedSpec::new("MIT Technology Review", &["https://www.technologyreview.com/feed/"], 10, false),
        ];

        Self {
            newsletters,
            feeds,
            search: Some(SearchApiSpec::default()),
            reddit: Some(SubredditSpec::default()),
        }
    }
}

/// Stage-1 bounds. The prompt asks for `prompt_min..=ceiling` stories;
/// sanitation pads below `floor` up to `pad_target` and cuts above `ceiling`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionBand {
    pub floor: usize,
    pub pad_target: usize,
    pub ceiling: usize,
    pub prompt_min: usize,
}

impl Default for SelectionBand {
    fn default() -> Self {
        Self {
            floor: 8,
            pad_target: 12,
            ceiling: 12,
            prompt_min: 10,
        }
    }
}

/// Immutable tables and thresholds injected into every component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sources: SourceCatalog,
    pub keywords: Vec<String>,
    pub categories: Vec<CategoryEntry>,
    pub default_category: CategoryEntry,
    /// Fewer deduped articles than this ends the run as skipped.
    pub min_articles: usize,
    pub selection: SelectionBand,
    pub generation_batches: usize,
    pub fallback_enabled: bool,
    pub fallback_size: usize,
    pub dedup_window_days: u32,
    pub index_cap: usize,
    pub listing_description_chars: usize,
    pub fetch: FetchConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: SourceCatalog::default(),
            keywords: default_keywords(),
            categories: CategoryEntry::default_palette(),
            default_category: CategoryEntry::general(),
            min_articles: 5,
            selection: SelectionBand::default(),
            generation_batches: 2,
            fallback_enabled: true,
            fallback_size: 12,
            dedup_window_days: 7,
            index_cap: 30,
            listing_description_chars: 300,
            fetch: FetchConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults, overridden by any fields present in the TOML file at `path`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)
            .map_err(|e| DigestError::Config(format!("{}: {}", path.display(), e)))?;

        info!("Loaded pipeline config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| DigestError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let band = &self.selection;
        if band.floor == 0 || band.floor > band.ceiling || band.pad_target > band.ceiling {
            return Err(DigestError::Config(format!(
                "selection band must satisfy 0 < floor <= ceiling and pad_target <= ceiling (got {:?})",
                band
            )));
        }
        if self.generation_batches == 0 {
            return Err(DigestError::Config("generation_batches must be at least 1".to_string()));
        }
        if self.index_cap < self.dedup_window_days as usize {
            return Err(DigestError::Config(format!(
                "index_cap ({}) must cover the dedup window ({} days)",
                self.index_cap, self.dedup_window_days
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.sources.newsletters.iter().all(|n| n.trusted));
        assert!(config.sources.feeds.iter().all(|f| !f.trusted));
    }

    #[test]
    fn toml_overrides_only_given_fields() {
        let config = PipelineConfig::from_toml(
            r#"
            min_articles = 3
            keywords = ["robotics"]

            [selection]
            floor = 4
            pad_target = 6
            ceiling = 6
            "#,
        )
        .unwrap();
        assert_eq!(config.min_articles, 3);
        assert_eq!(config.keywords, vec!["robotics".to_string()]);
        assert_eq!(config.selection.prompt_min, 10);
        assert_eq!(config.dedup_window_days, 7);
        assert_eq!(config.sources, SourceCatalog::default());
    }

    #[test]
    fn inconsistent_band_is_rejected() {
        let err = PipelineConfig::from_toml("[selection]\nfloor = 20\n").unwrap_err();
        assert!(matches!(err, DigestError::Config(_)));
    }
}
