use crate::categories::CategoryPalette;
use crate::collector::SourceCollector;
use crate::config::PipelineConfig;
use crate::dedup::dedupe;
use crate::digest::{assemble_digest, DigestOrchestrator, DigestOutcome, OrchestratorSettings, PipelineStage, RunStats};
use crate::fetcher::HttpFetch;
use crate::history::HistoryStore;
use crate::llm_adapter::LlmAdapter;
use crate::relevance::RelevanceFilter;
use crate::sources;
use crate::traits::PullSource;
use crate::types::{DigestError, GenerationMode, Result};
use chrono::{NaiveDate, SecondsFormat, Utc};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// How a run ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Written {
        path: PathBuf,
        stories: usize,
        generation: GenerationMode,
    },
    /// Too few articles survived dedup; nothing was written
    Skipped { remaining: usize },
}

/// One batch run: collect, filter, dedupe, generate, persist.
pub struct DigestPipeline {
    config: PipelineConfig,
    collector: SourceCollector,
    fetch: Box<dyn HttpFetch>,
    llm: Box<dyn LlmAdapter>,
    store: HistoryStore,
}

impl DigestPipeline {
    /// Pipeline over every source in `config.sources`.
    pub fn new(
        config: PipelineConfig,
        store: HistoryStore,
        fetch: Box<dyn HttpFetch>,
        llm: Box<dyn LlmAdapter>,
    ) -> Self {
        let collector = SourceCollector::new(sources::from_catalog(&config.sources));
        Self {
            config,
            collector,
            fetch,
            llm,
            store,
        }
    }

    /// Replaces the catalog-built sources.
    pub fn with_sources(mut self, sources: Vec<Box<dyn PullSource>>) -> Self {
        self.collector = SourceCollector::new(sources);
        self
    }

    pub async fn run(&self, date: NaiveDate) -> Result<RunOutcome> {
        let started = Instant::now();
        let fetched_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        info!("Building digest for {} from {} sources", date, self.collector.len());

        let historical = self.store.load_fingerprints(date, self.config.dedup_window_days);

        let report = self.collector.collect(self.fetch.as_ref()).await;
        let raw_articles = report.articles.len();
        PipelineStage::Collected.enter(format!("{} raw articles", raw_articles));

        let filter = RelevanceFilter::new(&self.config.keywords, report.trusted_sources);
        let relevant = filter.filter(report.articles);
        let after_filter = relevant.len();
        PipelineStage::Filtered.enter(format!("{} of {} relevant", after_filter, raw_articles));

        let deduped = dedupe(relevant, &historical);
        let dedup_removed = deduped.removed();
        let pool = deduped.articles;
        PipelineStage::Deduped.enter(format!("{} remain, {} removed", pool.len(), dedup_removed));

        if pool.len() < self.config.min_articles {
            PipelineStage::Skipped.enter(format!(
                "only {} articles after dedup (need {})",
                pool.len(),
                self.config.min_articles
            ));
            return Ok(RunOutcome::Skipped { remaining: pool.len() });
        }

        let palette = CategoryPalette::new(self.config.categories.clone(), self.config.default_category.clone());
        let orchestrator =
            DigestOrchestrator::new(self.llm.as_ref(), palette, OrchestratorSettings::from(&self.config));
        let outcome = orchestrator.run(&pool, date).await;

        if let DigestOutcome::Fatal(reason) = &outcome {
            PipelineStage::Fatal.enter(reason);
            return Err(DigestError::Generation(reason.clone()));
        }

        let stats = RunStats {
            raw_articles,
            after_filter,
            after_dedup: pool.len(),
            dedup_removed,
            source_breakdown: report.breakdown,
        };
        let digest = assemble_digest(
            date,
            outcome,
            stats,
            self.llm.model_name(),
            fetched_at,
            started.elapsed().as_secs_f64(),
        )
        .ok_or_else(|| DigestError::Generation("no digest assembled".to_string()))?;

        if digest.news.is_empty() {
            PipelineStage::Fatal.enter("zero stories produced");
            return Err(DigestError::Generation("zero stories produced".to_string()));
        }

        let path = self.store.write_digest(&digest)?;
        self.store.update_index(date, self.config.index_cap)?;

        Ok(RunOutcome::Written {
            path,
            stories: digest.news.len(),
            generation: digest.crawl_log.generation,
        })
    }
}
