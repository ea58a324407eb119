//! Bounded retries of a task execution

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use assistant_platform::Platform;

use crate::poller::{ExecutionPoller, PollError};
use crate::result::IndexingResult;

const CANCELLED: &str = "cancelled";

/// How many times to try a task and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts,
            retry_delay,
        }
    }

    /// Attempts actually made; a zero budget still tries once
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(10))
    }
}

/// Runs one task per document and waits for it, retrying on failure
pub struct TaskRunner {
    platform: Arc<dyn Platform>,
    poller: ExecutionPoller,
    task_id: String,
    policy: RetryPolicy,
}

impl TaskRunner {
    pub fn new(
        platform: Arc<dyn Platform>,
        poller: ExecutionPoller,
        task_id: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            platform,
            poller,
            task_id: task_id.into(),
            policy,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute the task for `url` until it succeeds or attempts run out
    ///
    /// Never fails: every outcome, including cancellation, is reported as an
    /// [`IndexingResult`].
    pub async fn run_with_retry(
        &self,
        url: &str,
        content: &str,
        cancel: &CancellationToken,
    ) -> IndexingResult {
        let max_attempts = self.policy.attempts();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return IndexingResult::failed(url, CANCELLED, attempt - 1);
            }

            info!("Indexing {} (attempt {}/{})", url, attempt, max_attempts);
            match self.attempt(url, content, cancel).await {
                Ok(execution_id) => {
                    info!("Indexed {} with execution {}", url, execution_id);
                    return IndexingResult::succeeded(url, execution_id, attempt);
                }
                Err(PollError::Cancelled { .. }) => {
                    warn!("Indexing of {} cancelled", url);
                    return IndexingResult::failed(url, CANCELLED, attempt);
                }
                Err(e) => {
                    warn!("Attempt {} for {} failed: {}", attempt, url, e);
                    last_error = e.to_string();
                }
            }

            if attempt < max_attempts {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return IndexingResult::failed(url, CANCELLED, attempt);
                    }
                    _ = tokio::time::sleep(self.policy.retry_delay) => {}
                }
            }
        }

        IndexingResult::failed(url, last_error, max_attempts)
    }

    async fn attempt(
        &self,
        url: &str,
        content: &str,
        cancel: &CancellationToken,
    ) -> Result<String, PollError> {
        let input = json!({ "url": url, "content": content });
        let execution = self.platform.create_execution(&self.task_id, input).await?;
        self.poller.poll(&execution.id, cancel).await?;
        Ok(execution.id)
    }
}
