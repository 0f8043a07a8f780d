use crate::config::SelectionBand;
use crate::json_repair::{extract_first_array, strip_code_fences};
use crate::types::Article;
use crate::utils::text::truncate_chars;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt::Write;
use tracing::{debug, info};

/// Numbered listing of the whole pool, 1-based as the model will refer to it.
pub fn build_listing(articles: &[Article], description_chars: usize) -> String {
    let mut listing = String::new();
    for (i, article) in articles.iter().enumerate() {
        let _ = write!(
            listing,
            "\n{}. Title: {}\n   Source: {}\n   URL: {}\n   Description: {}\n",
            i + 1,
            article.title,
            article.source,
            article.link,
            truncate_chars(&article.description, description_chars)
        );
    }
    listing
}

pub fn build_selection_prompt(
    articles: &[Article],
    band: &SelectionBand,
    description_chars: usize,
    date: NaiveDate,
) -> String {
    format!(
        r#"You are the editor of a daily AI news briefing. Today is {date}.

Below are {count} candidate articles. Select the {min}-{max} stories that matter most today.

Prefer stories with:
- technical significance (new models, research results, benchmarks)
- real product or policy impact
- funding rounds or deals of $100M or more
- meaningful open-source releases
- diversity across categories (do not pick several stories about the same event)

Reject minor updates, duplicates of an already selected story, listicles and promotional content.

ARTICLES:
{listing}

Respond with a JSON array of the selected article numbers ONLY, most important first, for example [3, 12, 7].
No explanation, no markdown."#,
        date = date.format("%Y-%m-%d"),
        count = articles.len(),
        min = band.prompt_min.min(band.ceiling),
        max = band.ceiling,
        listing = build_listing(articles, description_chars),
    )
}

/// 0-based indices from the model's reply. Anything that is not an integer
/// in `1..=pool_len`, and repeats, are dropped silently.
pub fn parse_selection(raw: &str, pool_len: usize) -> Vec<usize> {
    let Some(array) = extract_first_array(strip_code_fences(raw)) else {
        debug!("Selection reply had no array");
        return Vec::new();
    };
    let values: Vec<serde_json::Value> = match serde_json::from_str(array) {
        Ok(values) => values,
        Err(e) => {
            debug!("Selection array did not parse: {}", e);
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    values
        .iter()
        .filter_map(serde_json::Value::as_u64)
        .filter_map(|n| usize::try_from(n).ok())
        .filter(|&n| (1..=pool_len).contains(&n))
        .map(|n| n - 1)
        .filter(|&idx| seen.insert(idx))
        .collect()
}

/// Holds a selection inside the band: below `floor` it is padded with the
/// unselected articles in pool order up to `pad_target`; above `ceiling` it
/// is cut, keeping the model's order.
pub fn sanitize_selection(mut selected: Vec<usize>, pool_len: usize, band: &SelectionBand) -> Vec<usize> {
    if selected.len() < band.floor {
        let chosen: HashSet<usize> = selected.iter().copied().collect();
        let missing = band.pad_target.saturating_sub(selected.len());
        let padding: Vec<usize> = (0..pool_len).filter(|i| !chosen.contains(i)).take(missing).collect();
        info!(
            "Selection had {} valid picks (< {}), padding with {}",
            selected.len(),
            band.floor,
            padding.len()
        );
        selected.extend(padding);
    }

    if selected.len() > band.ceiling {
        debug!("Selection had {} picks, keeping {}", selected.len(), band.ceiling);
        selected.truncate(band.ceiling);
    }
    selected
}
