use crate::types::{Article, Localized, NewsItem};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

/// Hex chars kept from the SHA-256 of the fingerprinted text.
pub const FINGERPRINT_LEN: usize = 12;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid non-word regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Lowercase, strip non-word/non-space characters, collapse whitespace.
/// Stripped characters become spaces so `GPT-5` and `gpt 5` normalize alike.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, " ");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(text: &str) -> Self {
        let digest = Sha256::digest(text.as_bytes());
        let mut hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        hex.truncate(FINGERPRINT_LEN);
        Self(hex)
    }

    /// `None` for titles with no word characters, which would otherwise all collide.
    pub fn of_title(title: &str) -> Option<Self> {
        let normalized = normalize_title(title);
        (!normalized.is_empty()).then(|| Self::of(&normalized))
    }

    pub fn of_link(link: &str) -> Option<Self> {
        let link = link.trim();
        (!link.is_empty()).then(|| Self::of(link))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprints of every story published in the trailing dedup window.
/// Built once per run; the current run never adds to it.
#[derive(Debug, Clone, Default)]
pub struct HistoricalFingerprints {
    inner: HashSet<Fingerprint>,
}

impl HistoricalFingerprints {
    /// One entry per past story: its bilingual title and source URL.
    pub fn from_stories<'a>(stories: impl IntoIterator<Item = (&'a Localized, &'a str)>) -> Self {
        let mut inner = HashSet::new();
        for (title, url) in stories {
            inner.extend(
                [
                    Fingerprint::of_title(&title.en),
                    Fingerprint::of_title(&title.zh),
                    Fingerprint::of_link(url),
                ]
                .into_iter()
                .flatten(),
            );
        }
        Self { inner }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.inner.extend(Fingerprint::of_title(title));
        self
    }

    pub fn with_link(mut self, link: &str) -> Self {
        self.inner.extend(Fingerprint::of_link(link));
        self
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.inner.contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DedupReport {
    pub articles: Vec<Article>,
    pub batch_duplicates: usize,
    pub historical_duplicates: usize,
}

impl DedupReport {
    pub fn removed(&self) -> usize {
        self.batch_duplicates + self.historical_duplicates
    }
}

/// Single ordered pass: an article is dropped when its title or link
/// fingerprint was already seen in this batch or appears in `historical`.
pub fn dedupe(articles: Vec<Article>, historical: &HistoricalFingerprints) -> DedupReport {
    let mut seen: HashSet<Fingerprint> = HashSet::new();
    let mut kept = Vec::with_capacity(articles.len());
    let mut batch_duplicates = 0;
    let mut historical_duplicates = 0;

    for article in articles {
        let fingerprints: Vec<Fingerprint> = [
            Fingerprint::of_title(&article.title),
            Fingerprint::of_link(&article.link),
        ]
        .into_iter()
        .flatten()
        .collect();

        if fingerprints.iter().any(|fp| historical.contains(fp)) {
            debug!("Dropping previously published story: {}", article.title);
            historical_duplicates += 1;
            continue;
        }
        if fingerprints.iter().any(|fp| seen.contains(fp)) {
            debug!("Dropping duplicate in batch: {}", article.title);
            batch_duplicates += 1;
            continue;
        }

        seen.extend(fingerprints);
        kept.push(article);
    }

    info!(
        "Dedup kept {} articles ({} in-batch duplicates, {} seen in history)",
        kept.len(),
        batch_duplicates,
        historical_duplicates
    );

    DedupReport {
        articles: kept,
        batch_duplicates,
        historical_duplicates,
    }
}

/// Drops generated items that repeat an earlier item's title or URL.
pub fn dedupe_news_items(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut seen: HashSet<Fingerprint> = HashSet::new();
    let mut kept = Vec::with_capacity(items.len());

    for item in items {
        let fingerprints: Vec<Fingerprint> = [
            Fingerprint::of_title(&item.title.en),
            Fingerprint::of_link(&item.source_url),
        ]
        .into_iter()
        .flatten()
        .collect();

        if fingerprints.iter().any(|fp| seen.contains(fp)) {
            debug!("Dropping repeated generated story: {}", item.title.en);
            continue;
        }
        seen.extend(fingerprints);
        kept.push(item);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, link: &str) -> Article {
        Article::new(title, link, "Test").unwrap()
    }

    #[test]
    fn normalization_is_idempotent() {
        for t in ["GPT-5 Launches!", "  Mixed   CASE\ttext ", "模型 发布！", "", "!!!", "İstanbul AI"] {
            let once = normalize_title(t);
            assert_eq!(normalize_title(&once), once, "input {:?}", t);
        }
    }

    #[test]
    fn fingerprint_ignores_case_and_punctuation() {
        assert_eq!(normalize_title("GPT-5 Launches!"), "gpt 5 launches");
        assert_eq!(
            Fingerprint::of_title("GPT-5 Launches!"),
            Fingerprint::of_title("gpt 5 launches")
        );
        assert!(Fingerprint::of_title("gpt 5 launches").is_some());
        assert_eq!(Fingerprint::of("abc").as_str().len(), FINGERPRINT_LEN);
        assert_eq!(Fingerprint::of("abc"), Fingerprint::of("abc"));
        assert_eq!(Fingerprint::of_title("?!"), None);
    }

    #[test]
    fn same_story_with_different_casing_collapses() {
        let report = dedupe(
            vec![
                article("AI Model Released", "https://a.example/1"),
                article("ai model released", "https://b.example/2"),
                article("AI MODEL RELEASED!!", "https://c.example/3"),
            ],
            &HistoricalFingerprints::default(),
        );
        assert_eq!(report.articles.len(), 1);
        assert_eq!(report.articles[0].link, "https://a.example/1");
        assert_eq!(report.batch_duplicates, 2);
    }

    #[test]
    fn shared_link_is_a_duplicate() {
        let report = dedupe(
            vec![
                article("One headline", "https://a.example/story"),
                article("Different headline", "https://a.example/story"),
                article("Third", "https://a.example/other"),
            ],
            &HistoricalFingerprints::default(),
        );
        let titles: Vec<_> = report.articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["One headline", "Third"]);
    }

    #[test]
    fn historical_titles_are_dropped() {
        let history = HistoricalFingerprints::default().with_title("EU AI Act Passed");
        let report = dedupe(
            vec![
                article("eu ai act passed", "https://new.example/eu"),
                article("Something new", "https://new.example/x"),
            ],
            &history,
        );
        assert_eq!(report.articles.len(), 1);
        assert_eq!(report.articles[0].title, "Something new");
        assert_eq!(report.historical_duplicates, 1);
    }

    #[test]
    fn survivors_share_no_fingerprint() {
        let history = HistoricalFingerprints::default().with_link("https://old.example/1");
        let input = vec![
            article("A", "https://old.example/1"),
            article("B", "https://x.example/1"),
            article("b!", "https://x.example/2"),
            article("C", "https://x.example/1"),
            article("D", "https://x.example/4"),
        ];
        let report = dedupe(input, &history);
        let mut seen = HashSet::new();
        for a in &report.articles {
            for fp in [Fingerprint::of_title(&a.title), Fingerprint::of_link(&a.link)].into_iter().flatten() {
                assert!(!history.contains(&fp));
                assert!(seen.insert(fp));
            }
        }
        assert_eq!(report.articles.len(), 2);
        assert_eq!(report.removed(), 3);
    }
}
