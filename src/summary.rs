use crate::client::GenerationClient;
use crate::normalize::normalize;
use crate::retry::RetryPolicy;
use crate::types::{EngineConfig, PipelineError, Result, ServiceError};
use tracing::{info, warn};

/// One generation call over the merged digest to produce the run-level
/// summary. Unlike per-article enrichment this is a single logical item, so
/// failure after the retry budget is an error for the caller to handle.
pub async fn generate_summary(
    client: &dyn GenerationClient,
    retry: &RetryPolicy,
    config: &EngineConfig,
    digest: &str,
) -> Result<String> {
    if retry.max_retries() == 0 {
        return Err(PipelineError::General(
            "retry budget of zero permits no attempts".to_string(),
        ));
    }

    let mut backoff = retry.backoff();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;

        let call = client.summarize(digest, &config.model_id);
        let result = match tokio::time::timeout(config.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::transient(format!(
                "request exceeded {:?} timeout",
                config.request_timeout
            ))),
        };

        match result {
            Ok(raw) => {
                let text = normalize(&raw)
                    .map_err(|e| PipelineError::General(e.to_string()))?;
                info!("Run summary generated on attempt {}", attempts);
                return Ok(text);
            }
            Err(err) if retry.should_retry(&err, attempts) => {
                let delay = retry.next_delay(&mut backoff);
                warn!(
                    "Summary attempt {}/{} failed ({}), retrying in {:?}",
                    attempts,
                    retry.max_retries(),
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(PipelineError::Service(err)),
        }
    }
}
