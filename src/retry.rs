use crate::types::{ServiceError, ServiceErrorKind};
use backoff::backoff::Backoff;
use backoff::exponential::ExponentialBackoff;
use std::sync::Arc;
use std::time::Duration;

/// Predicate deciding whether a service error is worth retrying. Injectable
/// so the engine stays independent of any transport's error taxonomy.
pub type TransientClassifier = Arc<dyn Fn(&ServiceError) -> bool + Send + Sync>;

/// Retry budget and backoff schedule for per-article generation calls.
///
/// `max_retries` counts total attempts: `should_retry` returns false once
/// `attempts` reaches it, so an always-failing call is attempted exactly
/// `max_retries` times. A budget of zero permits no attempts.
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    randomization_factor: f64,
    classifier: TransientClassifier,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff,
            randomization_factor: 0.5,
            classifier: Arc::new(|err: &ServiceError| err.kind == ServiceErrorKind::Transient),
        }
    }

    /// Replace the transient-error classifier.
    pub fn with_classifier(mut self, classifier: TransientClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Disable jitter. Useful for deterministic tests.
    pub fn without_jitter(mut self) -> Self {
        self.randomization_factor = 0.0;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether another attempt should be made after `attempts` calls have
    /// already failed with `error`.
    pub fn should_retry(&self, error: &ServiceError, attempts: u32) -> bool {
        attempts < self.max_retries && (self.classifier)(error)
    }

    /// A fresh backoff schedule for one article. Base interval doubles per
    /// attempt up to `max_backoff`, with jitter so simultaneous failures
    /// across workers do not retry in lockstep.
    pub fn backoff(&self) -> ExponentialBackoff<backoff::SystemClock> {
        ExponentialBackoff {
            current_interval: self.initial_backoff,
            initial_interval: self.initial_backoff,
            randomization_factor: self.randomization_factor,
            multiplier: 2.0,
            max_interval: self.max_backoff,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// Next sleep before another attempt. `ExponentialBackoff` with
    /// `max_elapsed_time: None` always yields an interval; the cap is a
    /// fallback rather than an expected path.
    pub fn next_delay(&self, backoff: &mut ExponentialBackoff<backoff::SystemClock>) -> Duration {
        backoff.next_backoff().unwrap_or(self.max_backoff)
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("initial_backoff", &self.initial_backoff)
            .field("max_backoff", &self.max_backoff)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transient() -> ServiceError {
        ServiceError::transient("timeout")
    }

    fn fatal() -> ServiceError {
        ServiceError::fatal("bad auth")
    }

    #[test]
    fn retries_transient_errors_within_budget() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(10));
        assert!(policy.should_retry(&transient(), 1));
        assert!(policy.should_retry(&transient(), 2));
        assert!(!policy.should_retry(&transient(), 3));
    }

    #[test]
    fn never_retries_fatal_errors() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(10));
        assert!(!policy.should_retry(&fatal(), 1));
    }

    #[test]
    fn custom_classifier_overrides_default() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(10))
            .with_classifier(Arc::new(|err| err.message.contains("quota")));
        assert!(!policy.should_retry(&transient(), 1));
        assert!(policy.should_retry(&ServiceError::fatal("quota exceeded"), 1));
    }

    #[test]
    fn backoff_doubles_up_to_cap_without_jitter() {
        let policy = RetryPolicy::new(10, Duration::from_millis(100), Duration::from_millis(400))
            .without_jitter();
        let mut backoff = policy.backoff();
        let delays: Vec<Duration> = (0..4).map(|_| policy.next_delay(&mut backoff)).collect();
        assert_eq!(delays[0], Duration::from_millis(100));
        assert_eq!(delays[1], Duration::from_millis(200));
        assert_eq!(delays[2], Duration::from_millis(400));
        // Capped at max_backoff from here on.
        assert_eq!(delays[3], Duration::from_millis(400));
    }

    #[test]
    fn jittered_backoff_stays_within_bounds() {
        let policy = RetryPolicy::new(10, Duration::from_millis(100), Duration::from_millis(800));
        let mut backoff = policy.backoff();
        for _ in 0..20 {
            let delay = policy.next_delay(&mut backoff);
            // Jitter factor is 0.5, so no delay exceeds 1.5x the cap.
            assert!(delay <= Duration::from_millis(1200));
        }
    }
}
