use crate::client::GenerationClient;
use crate::ledger::Ledger;
use crate::normalize::normalize;
use crate::retry::RetryPolicy;
use crate::types::{
    Abstract, ArticleRef, EngineConfig, EnrichmentOutcome, FailureKind, PipelineError, Result,
    ServiceError, ServiceErrorKind,
};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one enrichment run: the full audit ledger plus the successful
/// abstracts in batch order, ready for the merge stage.
#[derive(Debug)]
pub struct EnrichmentReport {
    pub ledger: Ledger,
    pub abstracts: Vec<Abstract>,
}

/// Fans one generation call per article out to at most `max_workers`
/// concurrent tasks, retries transient failures with backoff, and collects
/// exactly one terminal outcome per article.
///
/// Owns its client handle and configuration explicitly: construct one per
/// run, no process-wide state.
pub struct EnrichmentEngine {
    client: Arc<dyn GenerationClient>,
    config: EngineConfig,
    retry: RetryPolicy,
}

impl EnrichmentEngine {
    pub fn new(client: Arc<dyn GenerationClient>, config: EngineConfig) -> Self {
        let retry = RetryPolicy::new(
            config.max_retries,
            config.initial_backoff,
            config.max_backoff,
        );
        Self {
            client,
            config,
            retry,
        }
    }

    /// Replace the retry policy, e.g. to inject a custom transient-error
    /// classifier.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Summarize every article in `batch`. Per-article failures are
    /// contained and recorded in the ledger; only batch-level precondition
    /// violations abort the call, and they do so before any work is
    /// dispatched. The returned abstracts follow batch order regardless of
    /// completion order.
    pub async fn enrich(&self, batch: &[ArticleRef]) -> Result<EnrichmentReport> {
        validate_batch(batch)?;

        if batch.is_empty() {
            debug!("Empty batch, nothing to enrich");
            return Ok(EnrichmentReport {
                ledger: Ledger::new(),
                abstracts: Vec::new(),
            });
        }

        info!(
            "Enriching {} article(s) with up to {} worker(s)",
            batch.len(),
            self.config.max_workers
        );

        let outcomes: Vec<EnrichmentOutcome> = stream::iter(batch.iter().cloned())
            .map(|article| self.enrich_one(article))
            .buffer_unordered(self.config.max_workers.max(1))
            .collect()
            .await;

        let mut ledger = Ledger::new();
        for outcome in outcomes {
            ledger.record(outcome)?;
        }

        let abstracts: Vec<Abstract> = batch
            .iter()
            .filter_map(|article| {
                let outcome = ledger.get(&article.id)?;
                let text = outcome.text.as_ref()?;
                Some(Abstract {
                    article_id: article.id.clone(),
                    title: article.title.clone(),
                    url: article.url.clone(),
                    feed_name: article.feed_name.clone(),
                    text: text.clone(),
                })
            })
            .collect();

        info!(
            "Enrichment complete: {}/{} article(s) succeeded",
            abstracts.len(),
            batch.len()
        );

        Ok(EnrichmentReport { ledger, abstracts })
    }

    /// Run one article to its terminal outcome. Never returns an error:
    /// every failure mode becomes a `Failed` outcome.
    async fn enrich_one(&self, article: ArticleRef) -> EnrichmentOutcome {
        // max_retries counts total attempts, so a zero budget permits none:
        // the article is exhausted before the first call.
        if self.retry.max_retries() == 0 {
            return EnrichmentOutcome::failed(
                article.id,
                FailureKind::RetryExhausted,
                "retry budget of zero permits no attempts".to_string(),
                0,
            );
        }

        let prompt = build_prompt(&article);
        let mut backoff = self.retry.backoff();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            let call = self.client.summarize(&prompt, &self.config.model_id);
            let result = match tokio::time::timeout(self.config.request_timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(ServiceError::transient(format!(
                    "request exceeded {:?} timeout",
                    self.config.request_timeout
                ))),
            };

            match result {
                Ok(raw) => {
                    return match normalize(&raw) {
                        Ok(text) => {
                            debug!("Article {} summarized on attempt {}", article.id, attempts);
                            EnrichmentOutcome::success(article.id, text, attempts)
                        }
                        Err(e) => EnrichmentOutcome::failed(
                            article.id,
                            FailureKind::Normalization,
                            e.to_string(),
                            attempts,
                        ),
                    };
                }
                Err(err) if self.retry.should_retry(&err, attempts) => {
                    let delay = self.retry.next_delay(&mut backoff);
                    warn!(
                        "Article {}: attempt {}/{} failed ({}), retrying in {:?}",
                        article.id,
                        attempts,
                        self.retry.max_retries(),
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    let kind = match err.kind {
                        ServiceErrorKind::Fatal => FailureKind::Fatal,
                        ServiceErrorKind::Transient => FailureKind::RetryExhausted,
                    };
                    return EnrichmentOutcome::failed(article.id, kind, err.message, attempts);
                }
            }
        }
    }
}

/// The user-message content sent to the generation service, laid out the
/// same way the extraction stage writes article files.
fn build_prompt(article: &ArticleRef) -> String {
    format!(
        "{}\n\n{}\n\n{} {}\n\n{}",
        article.url,
        article.title,
        article.feed_name,
        article.fetched_at.format("%Y-%m-%d"),
        article.body
    )
}

/// Batch preconditions: every id present and unique. Violations abort the
/// run before any generation call is dispatched.
fn validate_batch(batch: &[ArticleRef]) -> Result<()> {
    let mut seen = HashSet::with_capacity(batch.len());
    for article in batch {
        if article.id.is_empty() {
            return Err(PipelineError::InvalidBatch(format!(
                "article with empty id (title: {:?})",
                article.title
            )));
        }
        if !seen.insert(article.id.as_str()) {
            return Err(PipelineError::InvalidBatch(format!(
                "duplicate article id: {}",
                article.id
            )));
        }
    }
    Ok(())
}
