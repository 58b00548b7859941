use crate::types::{ArticleRef, EnrichmentOutcome, PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;
use uuid::Uuid;

/// Complete per-article outcome record for one run: the audit trail and the
/// worklist source for the next pipeline stage.
///
/// Each article id is written exactly once, by exactly one worker; a second
/// insert for the same id is a logic error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    pub run_id: Uuid,
    outcomes: HashMap<String, EnrichmentOutcome>,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            outcomes: HashMap::new(),
        }
    }

    pub fn record(&mut self, outcome: EnrichmentOutcome) -> Result<()> {
        if self.outcomes.contains_key(&outcome.article_id) {
            return Err(PipelineError::General(format!(
                "duplicate ledger entry for article {}",
                outcome.article_id
            )));
        }
        self.outcomes.insert(outcome.article_id.clone(), outcome);
        Ok(())
    }

    pub fn get(&self, article_id: &str) -> Option<&EnrichmentOutcome> {
        self.outcomes.get(article_id)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Ids of successful articles in the order they appear in `batch`. The
    /// digest order is always reconstructed from batch order, never from
    /// worker completion order.
    pub fn successful_ids(&self, batch: &[ArticleRef]) -> Vec<String> {
        batch
            .iter()
            .filter(|article| {
                self.outcomes
                    .get(&article.id)
                    .map(|o| o.is_success())
                    .unwrap_or(false)
            })
            .map(|article| article.id.clone())
            .collect()
    }

    pub fn failures(&self) -> Vec<&EnrichmentOutcome> {
        self.outcomes.values().filter(|o| !o.is_success()).collect()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }

    /// Persist the successful-id worklist, one id per line in digest order.
    /// The next pipeline stage consumes this file as its input list.
    pub fn write_worklist(&self, path: &Path, batch: &[ArticleRef]) -> Result<()> {
        let mut lines = self.successful_ids(batch).join("\n");
        if !lines.is_empty() {
            lines.push('\n');
        }
        std::fs::write(path, lines)?;
        Ok(())
    }

    /// Log every failed article with its error kind and attempt count.
    /// Failures are reported for operator review, never silently dropped.
    pub fn log_failures(&self) {
        for outcome in self.failures() {
            warn!(
                "Article {} failed after {} attempt(s): {:?} - {}",
                outcome.article_id,
                outcome.attempts,
                outcome.error,
                outcome.error_message.as_deref().unwrap_or("unknown error"),
            );
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
