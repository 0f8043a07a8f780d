use crate::categories::CategoryPalette;
use crate::config::{PipelineConfig, SelectionBand};
use crate::generation::{build_generation_prompt, finalize_items, items_from_reply, split_batches};
use crate::llm_adapter::{LlmAdapter, LlmError};
use crate::selection::{build_selection_prompt, parse_selection, sanitize_selection};
use crate::types::{Article, CrawlLog, Digest, GenerationMode, Localized, NewsItem};
use crate::utils::text::truncate_chars;
use crate::utils::url::source_name_from_link;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{error, info, warn};

pub const SELECTION_MAX_TOKENS: u32 = 512;
pub const GENERATION_MAX_TOKENS: u32 = 4096;
const FALLBACK_SUMMARY_CHARS: usize = 200;

/// Run states, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Collected,
    Filtered,
    Deduped,
    Selected,
    Generated,
    Assembled,
    Skipped,
    Fatal,
}

impl PipelineStage {
    pub fn enter(self, detail: impl fmt::Display) {
        match self {
            PipelineStage::Fatal => error!("[{}] {}", self, detail),
            PipelineStage::Skipped => warn!("[{}] {}", self, detail),
            _ => info!("[{}] {}", self, detail),
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Collected => "collected",
            PipelineStage::Filtered => "filtered",
            PipelineStage::Deduped => "deduped",
            PipelineStage::Selected => "selected",
            PipelineStage::Generated => "generated",
            PipelineStage::Assembled => "assembled",
            PipelineStage::Skipped => "skipped",
            PipelineStage::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// Result of the two-stage LLM protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum DigestOutcome {
    Generated(Vec<NewsItem>),
    /// LLM output was unusable and the untranslated fallback was substituted
    Degraded { items: Vec<NewsItem>, reason: String },
    Fatal(String),
}

impl DigestOutcome {
    pub fn items(&self) -> &[NewsItem] {
        match self {
            DigestOutcome::Generated(items) | DigestOutcome::Degraded { items, .. } => items.as_slice(),
            DigestOutcome::Fatal(_) => &[],
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum StageFailure {
    #[error("selection request failed: {0}")]
    Selection(LlmError),

    #[error("LLM credentials missing: {0}")]
    Credential(LlmError),

    #[error("generation produced no usable items ({0})")]
    NoItems(String),
}

/// Behavior knobs of the orchestrator, taken from [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub band: SelectionBand,
    pub listing_description_chars: usize,
    pub generation_batches: usize,
    pub fallback_enabled: bool,
    pub fallback_size: usize,
}

impl From<&PipelineConfig> for OrchestratorSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            band: config.selection,
            listing_description_chars: config.listing_description_chars,
            generation_batches: config.generation_batches,
            fallback_enabled: config.fallback_enabled,
            fallback_size: config.fallback_size,
        }
    }
}

/// Selection then batched bilingual generation over the deduped pool, with
/// the non-LLM fallback when either stage fails.
pub struct DigestOrchestrator<'a> {
    llm: &'a dyn LlmAdapter,
    palette: CategoryPalette,
    settings: OrchestratorSettings,
}

impl<'a> DigestOrchestrator<'a> {
    pub fn new(llm: &'a dyn LlmAdapter, palette: CategoryPalette, settings: OrchestratorSettings) -> Self {
        Self { llm, palette, settings }
    }

    pub async fn run(&self, pool: &[Article], date: NaiveDate) -> DigestOutcome {
        match self.generate(pool, date).await {
            Ok(items) => {
                PipelineStage::Generated.enter(format!("{} stories from {}", items.len(), self.llm.model_name()));
                DigestOutcome::Generated(items)
            }
            Err(failure) => {
                let reason = failure.to_string();
                if !self.settings.fallback_enabled {
                    return DigestOutcome::Fatal(reason);
                }
                warn!("LLM digest failed ({}), using fallback digest", reason);
                let items = build_fallback_items(pool, self.settings.fallback_size, &self.palette, date);
                DigestOutcome::Degraded { items, reason }
            }
        }
    }

    async fn select(&self, pool: &[Article], date: NaiveDate) -> Result<Vec<Article>, StageFailure> {
        let prompt = build_selection_prompt(pool, &self.settings.band, self.settings.listing_description_chars, date);
        let reply = self
            .llm
            .complete(&prompt, SELECTION_MAX_TOKENS)
            .await
            .map_err(StageFailure::Selection)?;

        let picks = parse_selection(&reply, pool.len());
        let picks = sanitize_selection(picks, pool.len(), &self.settings.band);
        PipelineStage::Selected.enter(format!("{} of {} articles", picks.len(), pool.len()));

        Ok(picks.into_iter().map(|idx| pool[idx].clone()).collect())
    }

    async fn generate(&self, pool: &[Article], date: NaiveDate) -> Result<Vec<NewsItem>, StageFailure> {
        let selected = self.select(pool, date).await?;
        let mut items = Vec::new();
        let mut last_problem = String::from("no batches");

        for batch in split_batches(&selected, self.settings.generation_batches) {
            let prompt = build_generation_prompt(&batch, &self.palette, date);
            let reply = match self.llm.complete(&prompt, GENERATION_MAX_TOKENS).await {
                Ok(reply) => reply,
                Err(LlmError::MissingCredential) => {
                    return Err(StageFailure::Credential(LlmError::MissingCredential));
                }
                Err(e) => {
                    error!("Dropping batch {}: {}", batch.label(), e);
                    last_problem = e.to_string();
                    continue;
                }
            };

            match items_from_reply(&reply, &batch, &self.palette, date) {
                Ok(batch_items) => {
                    info!("Batch {} produced {} items", batch.label(), batch_items.len());
                    items.extend(batch_items);
                }
                Err(e) => {
                    error!("Dropping batch {}: {}", batch.label(), e);
                    last_problem = e.to_string();
                }
            }
        }

        let items = finalize_items(items);
        if items.is_empty() {
            return Err(StageFailure::NoItems(last_problem));
        }
        Ok(items)
    }
}

/// Untranslated digest from the first `size` pool articles: same text in both
/// locales, default category.
pub fn build_fallback_items(
    pool: &[Article],
    size: usize,
    palette: &CategoryPalette,
    date: NaiveDate,
) -> Vec<NewsItem> {
    let items = pool
        .iter()
        .take(size)
        .enumerate()
        .map(|(i, article)| {
            let summary = if article.description.is_empty() {
                article.title.clone()
            } else {
                truncate_chars(&article.description, FALLBACK_SUMMARY_CHARS)
            };
            let source = Some(article.source.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .or_else(|| source_name_from_link(&article.link))
                .unwrap_or_default();

            NewsItem {
                id: (i + 1).to_string(),
                category: palette.default_category(),
                title: Localized::same(article.title.clone()),
                summary: Localized::same(summary),
                source,
                source_url: article.link.clone(),
                date,
            }
        })
        .collect();
    finalize_items(items)
}

pub fn date_label(date: NaiveDate) -> Localized {
    Localized::new(
        date.format("%B %d, %Y").to_string(),
        format!("{}年{}月{}日", date.year(), date.month(), date.day()),
    )
}

/// Counters gathered before the LLM stages, copied into the crawl log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub raw_articles: usize,
    pub after_filter: usize,
    pub after_dedup: usize,
    pub dedup_removed: usize,
    pub source_breakdown: BTreeMap<String, usize>,
}

/// Builds the persisted record for a non-fatal outcome. `None` for `Fatal`.
pub fn assemble_digest(
    date: NaiveDate,
    outcome: DigestOutcome,
    stats: RunStats,
    model: String,
    fetched_at: String,
    elapsed_seconds: f64,
) -> Option<Digest> {
    let (news, generation, fallback_reason) = match outcome {
        DigestOutcome::Generated(items) => (items, GenerationMode::Llm, None),
        DigestOutcome::Degraded { items, reason } => (items, GenerationMode::Fallback, Some(reason)),
        DigestOutcome::Fatal(_) => return None,
    };

    let crawl_log = CrawlLog {
        fetched_at,
        elapsed_seconds: (elapsed_seconds * 10.0).round() / 10.0,
        raw_articles: stats.raw_articles,
        after_filter: stats.after_filter,
        after_dedup: stats.after_dedup,
        dedup_removed: stats.dedup_removed,
        final_stories: news.len(),
        model,
        generation,
        fallback_reason,
        source_breakdown: stats.source_breakdown,
    };

    PipelineStage::Assembled.enter(format!("{} stories for {}", news.len(), date));
    Some(Digest {
        date,
        date_label: date_label(date),
        crawl_log,
        news,
    })
}
