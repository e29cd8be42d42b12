//! Timeout and retry-with-backoff around a backend
//!
//! Hosted geospatial services are rate limited and occasionally unavailable.
//! Every attempt is bounded by a timeout; transient failures are retried with
//! jittered exponential backoff until the budget is spent, after which the last
//! failure is propagated with the total attempt count. Validation and data errors
//! are never retried.

use super::query::{QueryResult, QuerySpec};
use super::Backend;
use crate::constants::{
    DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_BACKOFF_MS, DEFAULT_MAX_RETRIES,
    DEFAULT_QUERY_TIMEOUT_MS,
};
use crate::error::{AnalysisError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Per-attempt timeout
    pub timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
            timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
        }
    }
}

impl RetryPolicy {
    /// Policy with no retries, keeping the timeout
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(AnalysisError::configuration(
                "query timeout must be greater than 0 ms",
            ));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(AnalysisError::configuration(format!(
                "max backoff ({}ms) is below initial backoff ({}ms)",
                self.max_backoff_ms, self.initial_backoff_ms
            )));
        }
        Ok(())
    }

    /// Delays between attempts: initial, 2x, 4x ... capped, then jittered
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        ExponentialBackoff::from_millis(2)
            .factor((self.initial_backoff_ms / 2).max(1))
            .max_delay(Duration::from_millis(self.max_backoff_ms.max(1)))
            .map(jitter)
            .take(self.max_retries)
    }
}

pub struct RetryingBackend<B> {
    inner: B,
    policy: RetryPolicy,
    name: String,
}

impl<B: Backend> RetryingBackend<B> {
    pub fn new(inner: B, policy: RetryPolicy) -> Self {
        let name = format!("{}+retry", inner.name());
        Self {
            inner,
            policy,
            name,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn attempt(&self, spec: &QuerySpec, attempts: &AtomicUsize) -> Result<QueryResult> {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("{} attempt {} on {}", self.name, attempt, spec.collection());

        let timeout = Duration::from_millis(self.policy.timeout_ms);
        match tokio::time::timeout(timeout, self.inner.execute(spec)).await {
            Ok(result) => result,
            Err(_) => Err(AnalysisError::backend_unavailable(
                attempt,
                format!("query timed out after {}ms", self.policy.timeout_ms),
            )),
        }
    }
}

#[async_trait]
impl<B: Backend> Backend for RetryingBackend<B> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, spec: &QuerySpec) -> Result<QueryResult> {
        let attempts = AtomicUsize::new(0);

        let result = RetryIf::spawn(
            self.policy.delays(),
            || self.attempt(spec, &attempts),
            |e: &AnalysisError| {
                let retry = e.is_retryable();
                if retry {
                    warn!(
                        "Transient failure on {}, retrying: {}",
                        spec.collection(),
                        e
                    );
                }
                retry
            },
        )
        .await;

        result.map_err(|e| match e {
            AnalysisError::BackendUnavailable { reason, .. } => {
                AnalysisError::backend_unavailable(attempts.load(Ordering::SeqCst), reason)
            }
            other => other,
        })
    }
}
