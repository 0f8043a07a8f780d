pub mod types;
pub mod retry;
pub mod fetcher;
pub mod parser;
pub mod utils;
pub mod traits;
pub mod sources;
pub mod collector;
pub mod config;
pub mod categories;
pub mod relevance;
pub mod dedup;
pub mod json_repair;
pub mod llm_adapter;
pub mod selection;
pub mod generation;
pub mod digest;
pub mod history;
pub mod pipeline;

pub use types::*;
pub use fetcher::{Fetcher, HttpFetch};
pub use parser::FeedParser;
pub use traits::PullSource;
pub use collector::{CollectionReport, SourceCollector};
pub use config::PipelineConfig;
pub use categories::CategoryPalette;
pub use relevance::RelevanceFilter;
pub use llm_adapter::{LlmAdapter, LlmError, LlmSettings, MockLlmAdapter, OpenAiCompatibleAdapter};
pub use digest::{DigestOrchestrator, DigestOutcome, OrchestratorSettings};
pub use history::HistoryStore;
pub use pipeline::{DigestPipeline, RunOutcome};
