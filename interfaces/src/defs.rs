use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Max description length kept on an [`Article`], in chars.
pub const MAX_DESCRIPTION_CHARS: usize = 600;

/// Uniform record produced by every source adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub link: String,
    pub description: String,
    pub source: String,
    /// Sub-feed qualifier, e.g. `r/LocalLLaMA` or the search query.
    pub source_tag: String,
    /// RFC 3339 timestamp, empty when the source gave none.
    pub published: String,
    pub score: Option<i64>,
}

impl Article {
    /// Builds an article, or `None` when title or link is blank.
    pub fn new(title: &str, link: &str, source: &str) -> Option<Self> {
        let title = title.trim();
        let link = link.trim();
        if title.is_empty() || link.is_empty() {
            return None;
        }
        Some(Self {
            title: title.to_string(),
            link: link.to_string(),
            description: String::new(),
            source: source.to_string(),
            source_tag: String::new(),
            published: String::new(),
            score: None,
        })
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.chars().take(MAX_DESCRIPTION_CHARS).collect();
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.source_tag = tag.to_string();
        self
    }

    pub fn with_published(mut self, published: &str) -> Self {
        self.published = published.to_string();
        self
    }

    pub fn with_score(mut self, score: i64) -> Self {
        self.score = Some(score);
        self
    }
}

/// A pair of English / Chinese strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Localized {
    pub en: String,
    pub zh: String,
}

impl Localized {
    pub fn new(en: impl Into<String>, zh: impl Into<String>) -> Self {
        Self { en: en.into(), zh: zh.into() }
    }

    /// Same text in both locales (untranslated fallback output).
    pub fn same(text: impl Into<String>) -> Self {
        let text = text.into();
        Self { en: text.clone(), zh: text }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub en: String,
    pub zh: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    pub category: Category,
    pub title: Localized,
    pub summary: Localized,
    pub source: String,
    pub source_url: String,
    pub date: NaiveDate,
}

/// How the stories of a digest were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Llm,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlLog {
    pub fetched_at: String,
    pub elapsed_seconds: f64,
    pub raw_articles: usize,
    pub after_filter: usize,
    pub after_dedup: usize,
    pub dedup_removed: usize,
    pub final_stories: usize,
    pub model: String,
    pub generation: GenerationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    pub source_breakdown: BTreeMap<String, usize>,
}

/// One persisted digest per calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Digest {
    pub date: NaiveDate,
    pub date_label: Localized,
    pub crawl_log: CrawlLog,
    pub news: Vec<NewsItem>,
}

/// `index.json`: dates newest first plus the latest one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestIndex {
    pub dates: Vec<NaiveDate>,
    pub latest: Option<NaiveDate>,
}

impl DigestIndex {
    /// Inserts `date` once, keeps dates sorted newest first and capped at `cap`.
    pub fn record(&mut self, date: NaiveDate, cap: usize) {
        if !self.dates.contains(&date) {
            self.dates.push(date);
        }
        self.dates.sort_unstable_by(|a, b| b.cmp(a));
        self.dates.truncate(cap.max(1));
        self.latest = self.dates.first().copied();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn article_requires_title_and_link() {
        assert!(Article::new("  ", "https://a.example", "x").is_none());
        assert!(Article::new("Title", "", "x").is_none());
        let a = Article::new(" Title ", "https://a.example", "x").unwrap();
        assert_eq!(a.title, "Title");
    }

    #[test]
    fn article_serializes_camel_case() {
        let a = Article::new("t", "https://a.example", "Reddit").unwrap().with_tag("r/OpenAI");
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["sourceTag"], "r/OpenAI");
        assert!(json.get("source_tag").is_none());
    }

    #[test]
    fn description_is_capped() {
        let long = "é".repeat(MAX_DESCRIPTION_CHARS + 50);
        let a = Article::new("t", "l", "s").unwrap().with_description(&long);
        assert_eq!(a.description.chars().count(), MAX_DESCRIPTION_CHARS);
    }

    #[test]
    fn index_record_is_idempotent_and_capped() {
        let mut index = DigestIndex::default();
        index.record(day("2026-10-17"), 3);
        index.record(day("2026-10-19"), 3);
        index.record(day("2026-10-19"), 3);
        index.record(day("2026-10-18"), 3);
        index.record(day("2026-10-16"), 3);
        assert_eq!(index.dates, vec![day("2026-10-19"), day("2026-10-18"), day("2026-10-17")]);
        assert_eq!(index.latest, Some(day("2026-10-19")));
    }

    #[test]
    fn digest_serializes_camel_case_and_literal_unicode() {
        let item = NewsItem {
            id: "eu-ai-act".into(),
            category: Category { en: "General".into(), zh: "综合".into(), color: "#6B7280".into() },
            title: Localized::new("EU AI Act", "欧盟人工智能法案"),
            summary: Localized::same("s"),
            source: "Reuters".into(),
            source_url: "https://example.com".into(),
            date: day("2026-10-19"),
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"sourceUrl\""));
        assert!(json.contains("欧盟人工智能法案"));
        assert!(json.contains("\"date\":\"2026-10-19\""));
    }
}
