use anyhow::{bail, Context};
use chrono::Utc;
use clap::Parser;
use news_digest::{
    summary::generate_summary, ArticleSource, DigestMerger, EngineConfig, EnrichmentEngine,
    OpenAiCompatClient, RetryPolicy, WorklistSource,
};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_ABSTRACT_PROMPT: &str = "Summarize the following article as a short Markdown \
abstract. Start with a level-1 heading naming the story, then two or three sentences of \
substance. Output Markdown only.";

const DEFAULT_SUMMARY_PROMPT: &str = "The following is a Markdown digest of article abstracts. \
Write a concise overview of the period's most important developments. Output Markdown only.";

#[derive(Parser, Debug)]
#[command(name = "news-digest", about = "Summarize a batch of articles into a digest document")]
struct Args {
    /// Worklist file: one article-file path per line.
    worklist: PathBuf,

    /// Directory for the digest, ledger and worklist artifacts.
    #[arg(long, default_value = "out")]
    output_dir: PathBuf,

    /// Maximum concurrent generation calls.
    #[arg(long, default_value_t = 20)]
    max_workers: usize,

    /// Total attempts per article, including the first.
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Model identifier, overriding DIGEST_MODEL_ID.
    #[arg(long)]
    model: Option<String>,

    /// Per-call timeout in seconds.
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,

    /// Skip the run-level summary call and emit the digest alone.
    #[arg(long)]
    skip_summary: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let api_key = env::var("DIGEST_API_KEY").context("DIGEST_API_KEY must be set")?;
    let base_url = env::var("DIGEST_BASE_URL").context("DIGEST_BASE_URL must be set")?;
    let model_id = args
        .model
        .or_else(|| env::var("DIGEST_MODEL_ID").ok())
        .unwrap_or_else(|| EngineConfig::default().model_id);

    if args.max_workers == 0 {
        bail!("--max-workers must be positive");
    }

    let config = EngineConfig {
        max_workers: args.max_workers,
        max_retries: args.max_retries,
        request_timeout: Duration::from_secs(args.timeout_secs),
        model_id,
        ..EngineConfig::default()
    };

    let source = WorklistSource::new(&args.worklist);
    info!("Loading articles from {}", source.source_name());
    let batch = source.load().await?;
    if batch.is_empty() {
        info!("No articles in the worklist, nothing to do");
        return Ok(());
    }

    tokio::fs::create_dir_all(&args.output_dir).await?;

    let client = OpenAiCompatClient::new(
        base_url.clone(),
        api_key.clone(),
        DEFAULT_ABSTRACT_PROMPT.to_string(),
    );
    let engine = EnrichmentEngine::new(Arc::new(client), config.clone());

    let report = engine.enrich(&batch).await?;
    report.ledger.log_failures();

    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let ledger_path = args.output_dir.join(format!("ledger_{}.json", stamp));
    tokio::fs::write(&ledger_path, serde_json::to_vec_pretty(&report.ledger)?).await?;
    info!("Ledger written to {}", ledger_path.display());

    let worklist_path = args.output_dir.join(format!("successful_{}.txt", stamp));
    report.ledger.write_worklist(&worklist_path, &batch)?;

    if report.abstracts.is_empty() {
        warn!(
            "No article succeeded ({} failure(s)); no digest produced",
            report.ledger.failures().len()
        );
        return Ok(());
    }

    let digest = DigestMerger::merge(&report.abstracts);
    let digest_path = args.output_dir.join(format!("abstract_md_{}.md", stamp));
    tokio::fs::write(&digest_path, &digest).await?;
    info!("Digest written to {}", digest_path.display());

    if !args.skip_summary {
        let summary_client =
            OpenAiCompatClient::new(base_url, api_key, DEFAULT_SUMMARY_PROMPT.to_string());
        let retry = RetryPolicy::new(
            config.max_retries,
            config.initial_backoff,
            config.max_backoff,
        );
        let summary = generate_summary(&summary_client, &retry, &config, &digest).await?;
        let deliverable = DigestMerger::compose_deliverable(&summary, &digest, Utc::now());
        let deliverable_path = args
            .output_dir
            .join(format!("AI News Update {}.md", Utc::now().format("%Y %m %d")));
        tokio::fs::write(&deliverable_path, deliverable).await?;
        info!("Deliverable written to {}", deliverable_path.display());
    }

    info!(
        "Run complete: {}/{} article(s) succeeded",
        report.ledger.success_count(),
        batch.len()
    );
    Ok(())
}
