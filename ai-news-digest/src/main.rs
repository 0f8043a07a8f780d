use ai_news_digest::{
    DigestPipeline, Fetcher, HistoryStore, LlmSettings, OpenAiCompatibleAdapter, PipelineConfig, RunOutcome,
};
use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Builds one dated bilingual AI news digest.
#[derive(Debug, Parser)]
#[command(name = "ai-news-digest", version)]
struct Cli {
    /// Directory holding `{date}.json` digests and `index.json`
    #[arg(long, env = "DIGEST_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// TOML file overriding pipeline defaults
    #[arg(long, env = "DIGEST_CONFIG")]
    config: Option<PathBuf>,

    /// Digest date (YYYY-MM-DD), defaults to today in UTC
    #[arg(long, env = "TARGET_DATE")]
    date: Option<NaiveDate>,

    /// Fail instead of writing the untranslated fallback digest
    #[arg(long)]
    no_fallback: bool,

    /// Days of prior digests scanned for already published stories
    #[arg(long)]
    dedup_window_days: Option<u32>,

    /// Bearer token for the chat-completions endpoint (required)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    base_url: String,

    /// Model used for selection and generation
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4o-mini")]
    model: String,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ai_news_digest=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<RunOutcome> {
    let api_key = cli.api_key.filter(|k| !k.trim().is_empty());
    if api_key.is_none() {
        bail!("OPENAI_API_KEY is not set");
    }

    let mut config = PipelineConfig::load(cli.config.as_deref()).context("loading pipeline config")?;
    if cli.no_fallback {
        config.fallback_enabled = false;
    }
    if let Some(days) = cli.dedup_window_days {
        config.dedup_window_days = days;
        config.index_cap = config.index_cap.max(days as usize);
    }

    let date = cli.date.unwrap_or_else(|| Utc::now().date_naive());

    let fetcher = Fetcher::new(config.fetch.clone()).context("building HTTP client")?;
    let llm = OpenAiCompatibleAdapter::new(LlmSettings {
        base_url: cli.base_url,
        model: cli.model,
        api_key,
        ..LlmSettings::default()
    })
    .context("building LLM client")?;

    let pipeline = DigestPipeline::new(config, HistoryStore::new(cli.data_dir), Box::new(fetcher), Box::new(llm));
    let outcome = pipeline.run(date).await.with_context(|| format!("digest for {}", date))?;
    Ok(outcome)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(RunOutcome::Written { path, stories, generation }) => {
            info!("Done: {} stories ({:?}) in {}", stories, generation, path.display());
            println!("DIGEST_STATUS=written");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Skipped { remaining }) => {
            info!("Skipped: only {} articles after dedup", remaining);
            println!("DIGEST_STATUS=skipped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
