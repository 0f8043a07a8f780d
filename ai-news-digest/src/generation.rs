use crate::categories::CategoryPalette;
use crate::dedup::dedupe_news_items;
use crate::json_repair::{parse_object_array, RepairError};
use crate::types::{Article, Localized, NewsItem};
use crate::utils::url::source_name_from_link;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt::Write;
use tracing::{debug, warn};

/// One generation request: a contiguous slice of the selection, numbered
/// from `offset + 1` so numbers stay unique across batches.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    pub offset: usize,
    pub articles: &'a [Article],
}

impl Batch<'_> {
    pub fn label(&self) -> String {
        format!("stories {}-{}", self.offset + 1, self.offset + self.articles.len())
    }

    fn article_by_number(&self, number: usize) -> Option<&Article> {
        number
            .checked_sub(self.offset + 1)
            .and_then(|idx| self.articles.get(idx))
    }
}

/// Splits into `count` roughly equal contiguous batches; empty ones are skipped.
pub fn split_batches(selected: &[Article], count: usize) -> Vec<Batch<'_>> {
    if selected.is_empty() {
        return Vec::new();
    }
    let size = selected.len().div_ceil(count.max(1));
    selected
        .chunks(size)
        .enumerate()
        .map(|(i, articles)| Batch {
            offset: i * size,
            articles,
        })
        .collect()
}

pub fn build_generation_prompt(batch: &Batch<'_>, palette: &CategoryPalette, date: NaiveDate) -> String {
    let mut listing = String::new();
    for (i, article) in batch.articles.iter().enumerate() {
        let _ = write!(
            listing,
            "\n{}. Title: {}\n   Source: {}\n   URL: {}\n   Description: {}\n",
            batch.offset + i + 1,
            article.title,
            article.source,
            article.link,
            article.description
        );
    }

    format!(
        r#"You are a bilingual (English / Chinese) AI news editor. Today is {date}.

Write one digest entry for EACH of the {count} articles below, in the same order.

For each article provide:
- id: the article number as given
- category_en: one of {categories}
- category_zh: the Chinese name of that category
- title_en / title_zh: concise, news-style titles
- summary_en / summary_zh: 2-3 informative sentences; the Chinese should read naturally, not like a translation
- source: the publication name
- sourceUrl: the article URL

ARTICLES:
{listing}

Respond with a JSON array ONLY (no markdown, no code fences), exactly {count} objects:
[
  {{
    "id": "1",
    "category_en": "Category Name",
    "category_zh": "分类名称",
    "title_en": "English Title",
    "title_zh": "中文标题",
    "summary_en": "English summary.",
    "summary_zh": "中文摘要。",
    "source": "Source Name",
    "sourceUrl": "https://..."
  }}
]
Do not use curly quotes in any field; use straight quotes or 「」."#,
        date = date.format("%Y-%m-%d"),
        count = batch.articles.len(),
        categories = palette.names().join(", "),
        listing = listing,
    )
}

fn text_field(object: &Value, key: &str) -> Option<String> {
    let text = match object.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Maps one model object onto a [`NewsItem`]. Category labels and color come
/// from the palette; absent text falls back to the source article.
fn to_news_item(
    object: &Value,
    position: usize,
    batch: &Batch<'_>,
    palette: &CategoryPalette,
    date: NaiveDate,
) -> NewsItem {
    let id = text_field(object, "id");
    let article = id
        .as_deref()
        .and_then(|id| id.parse::<usize>().ok())
        .and_then(|n| batch.article_by_number(n))
        .or_else(|| batch.articles.get(position));

    let category = palette.resolve(
        text_field(object, "category_en").as_deref(),
        text_field(object, "category_zh").as_deref(),
    );

    let fallback_title = article.map(|a| a.title.clone()).unwrap_or_default();
    let title_en = text_field(object, "title_en").unwrap_or_else(|| fallback_title.clone());
    let title_zh = text_field(object, "title_zh").unwrap_or_else(|| title_en.clone());

    let summary_en = text_field(object, "summary_en").unwrap_or_default();
    let summary_zh = text_field(object, "summary_zh").unwrap_or_else(|| summary_en.clone());

    let source_url = text_field(object, "sourceUrl")
        .or_else(|| article.map(|a| a.link.clone()))
        .unwrap_or_default();
    let source = text_field(object, "source")
        .or_else(|| article.map(|a| a.source.clone()).filter(|s| !s.is_empty()))
        .or_else(|| source_name_from_link(&source_url))
        .unwrap_or_default();

    NewsItem {
        id: id.unwrap_or_default(),
        category,
        title: Localized::new(title_en, title_zh),
        summary: Localized::new(summary_en, summary_zh),
        source,
        source_url,
        date,
    }
}

/// Parses one batch reply, recovering from truncation where possible.
pub fn items_from_reply(
    raw: &str,
    batch: &Batch<'_>,
    palette: &CategoryPalette,
    date: NaiveDate,
) -> Result<Vec<NewsItem>, RepairError> {
    let parsed = parse_object_array::<Value>(raw)?;
    if parsed.truncated {
        warn!(
            "Reply for {} was truncated, kept {} complete items",
            batch.label(),
            parsed.items.len()
        );
    }

    Ok(parsed
        .items
        .iter()
        .enumerate()
        .filter(|(_, object)| object.is_object())
        .map(|(position, object)| to_news_item(object, position, batch, palette, date))
        .filter(|item| !item.title.en.is_empty())
        .collect())
}

/// Last pass over the concatenated items: repeats are dropped and every
/// item gets a unique, non-empty id.
pub fn finalize_items(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut items = dedupe_news_items(items);
    let mut used: HashSet<String> = HashSet::new();

    for (n, item) in items.iter_mut().enumerate() {
        if item.id.is_empty() || used.contains(&item.id) {
            let mut candidate = format!("story-{}", n + 1);
            let mut bump = n + 1;
            while used.contains(&candidate) {
                bump += 1;
                candidate = format!("story-{}", bump);
            }
            debug!("Assigning id {} to {:?}", candidate, item.title.en);
            item.id = candidate;
        }
        used.insert(item.id.clone());
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn selection(n: usize) -> Vec<Article> {
        (1..=n)
            .map(|i| Article::new(&format!("Story {}", i), &format!("https://s.example/{}", i), "Wire").unwrap())
            .collect()
    }

    fn object(n: usize) -> String {
        format!(
            r#"{{"id": "{n}", "category_en": "Research", "category_zh": "研究", "title_en": "Title {n}", "title_zh": "标题{n}", "summary_en": "Summary {n}.", "summary_zh": "摘要{n}。", "source": "Wire", "sourceUrl": "https://s.example/{n}"}}"#
        )
    }

    #[test]
    fn batches_are_balanced_and_numbered_globally() {
        let articles = selection(7);
        let batches = split_batches(&articles, 2);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].articles.len(), 4);
        assert_eq!(batches[1].offset, 4);
        assert_eq!(batches[1].label(), "stories 5-7");
        assert!(split_batches(&[], 2).is_empty());
    }

    #[test]
    fn prompt_numbers_from_batch_offset() {
        let articles = selection(4);
        let batches = split_batches(&articles, 2);
        let prompt = build_generation_prompt(&batches[1], &CategoryPalette::default(), date());
        assert!(prompt.contains("3. Title: Story 3"));
        assert!(!prompt.contains("1. Title: Story 1"));
        assert!(prompt.contains("Policy & Regulation"));
    }

    #[test]
    fn truncated_batch_keeps_complete_items() {
        let articles = selection(6);
        let batch = Batch { offset: 0, articles: &articles };
        let complete: Vec<String> = (1..=5).map(object).collect();
        let raw = format!(
            "[{}, {{\"id\": \"6\", \"category_en\": \"Research\", \"title_en\": \"Title 6\", \"summ",
            complete.join(", ")
        );

        let items = items_from_reply(&raw, &batch, &CategoryPalette::default(), date()).unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
        assert_eq!(items[0].category.color, "#A855F7");
        assert_eq!(items[4].date, date());
    }

    #[test]
    fn missing_fields_get_placeholders() {
        let articles = selection(2);
        let batch = Batch { offset: 0, articles: &articles };
        let raw = r#"[{"id": 2, "category_en": "Space Lasers", "title_en": "Only a title"}]"#;

        let items = items_from_reply(raw, &batch, &CategoryPalette::default(), date()).unwrap();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.category.en, "General");
        assert_eq!(item.category.color, "#6B7280");
        assert_eq!(item.title.zh, "Only a title");
        assert_eq!(item.source_url, "https://s.example/2");
        assert_eq!(item.source, "Wire");
    }

    #[test]
    fn finalize_drops_repeats_and_fills_ids() {
        let articles = selection(3);
        let batch = Batch { offset: 0, articles: &articles };
        let raw = format!(
            r#"[{}, {{"title_en": "Title 1!", "sourceUrl": "https://other.example"}}, {{"id": "1", "title_en": "Fresh", "sourceUrl": "https://fresh.example"}}, {{"title_en": "No id", "sourceUrl": "https://x.example"}}]"#,
            object(1)
        );
        let items = items_from_reply(&raw, &batch, &CategoryPalette::default(), date()).unwrap();
        let items = finalize_items(items);

        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "story-2", "story-3"]);
        assert_eq!(items[1].title.en, "Fresh");
    }
}
