use crate::types::{Article, DigestError, Result};
use crate::utils::text::clean_html;
use feed_rs::parser;
use tracing::debug;

/// Turns RSS 2.0 / Atom payloads into [`Article`]s for one named source.
pub struct FeedParser;

impl FeedParser {
    /// Parses `content`, tagging every record with `source` / `tag`.
    /// Entries without a title or link are dropped.
    pub fn parse_articles(content: &str, source: &str, tag: &str) -> Result<Vec<Article>> {
        debug!("Parsing feed content for {} ({} bytes)", source, content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| DigestError::Parse(format!("Failed to parse feed for {}: {}", source, e)))?;

        let total = feed.entries.len();
        let articles: Vec<Article> = feed
            .entries
            .into_iter()
            .filter_map(|entry| Self::parse_entry(entry, source, tag))
            .collect();

        debug!("Parsed {} of {} entries from {}", articles.len(), total, source);
        Ok(articles)
    }

    fn parse_entry(entry: feed_rs::model::Entry, source: &str, tag: &str) -> Option<Article> {
        let title = clean_html(&entry.title.map(|t| t.content).unwrap_or_default());
        let link = entry.links.first().map(|l| l.href.clone()).unwrap_or_default();

        // Prefer the summary; full content is often the whole newsletter issue
        let description = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .map(|d| clean_html(&d))
            .unwrap_or_default();

        let published = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();

        Article::new(&title, &link, source).map(|article| {
            article
                .with_description(&description)
                .with_tag(tag)
                .with_published(&published)
        })
    }
}
