//! Poll a remote execution until it succeeds or fails

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use assistant_platform::{Execution, ExecutionStatus, Platform, PlatformError};

const DEFAULT_INTERVAL_S: u64 = 5;

#[derive(Error, Debug)]
pub enum PollError {
    #[error("execution {execution_id} failed{}", .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    ExecutionFailed {
        execution_id: String,
        reason: Option<String>,
    },

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("execution {execution_id} still not finished after {waited:?}")]
    TimedOut {
        execution_id: String,
        waited: Duration,
    },

    #[error("cancelled")]
    Cancelled { execution_id: String },
}

/// Poll cadence and wall-clock budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Fixed delay between status reads
    pub interval: Duration,
    /// Give up after this long; `None` waits as long as the platform runs
    pub max_wait: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_S),
            max_wait: None,
        }
    }
}

/// Waits for executions to reach a terminal status
#[derive(Clone)]
pub struct ExecutionPoller {
    platform: Arc<dyn Platform>,
    config: PollConfig,
}

impl ExecutionPoller {
    pub fn new(platform: Arc<dyn Platform>, config: PollConfig) -> Self {
        Self { platform, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Read status until `succeeded` (returned) or `failed` (an error)
    pub async fn poll(
        &self,
        execution_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Execution, PollError> {
        match self.config.max_wait {
            Some(limit) => tokio::time::timeout(limit, self.wait_terminal(execution_id, cancel))
                .await
                .map_err(|_| {
                    warn!("Execution {} exceeded poll budget {:?}", execution_id, limit);
                    PollError::TimedOut {
                        execution_id: execution_id.to_string(),
                        waited: limit,
                    }
                })?,
            None => self.wait_terminal(execution_id, cancel).await,
        }
    }

    async fn wait_terminal(
        &self,
        execution_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Execution, PollError> {
        loop {
            if cancel.is_cancelled() {
                return Err(PollError::Cancelled {
                    execution_id: execution_id.to_string(),
                });
            }

            let execution = self.platform.get_execution(execution_id).await?;
            match execution.status {
                ExecutionStatus::Succeeded => {
                    info!("Execution {} status: succeeded", execution_id);
                    return Ok(execution);
                }
                ExecutionStatus::Failed => {
                    warn!("Execution {} status: failed", execution_id);
                    return Err(PollError::ExecutionFailed {
                        execution_id: execution_id.to_string(),
                        reason: execution.error,
                    });
                }
                status => {
                    info!("Execution {} status: {}", execution_id, status);
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Polling of {} cancelled", execution_id);
                    return Err(PollError::Cancelled {
                        execution_id: execution_id.to_string(),
                    });
                }
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PollConfig::default();
        assert_eq!(config.interval, Duration::from_secs(5));
        assert!(config.max_wait.is_none());
    }

    #[test]
    fn test_error_messages() {
        let err = PollError::ExecutionFailed {
            execution_id: "e1".to_string(),
            reason: None,
        };
        assert_eq!(err.to_string(), "execution e1 failed");

        let err = PollError::ExecutionFailed {
            execution_id: "e1".to_string(),
            reason: Some("step 3 crashed".to_string()),
        };
        assert_eq!(err.to_string(), "execution e1 failed: step 3 crashed");

        let err = PollError::Cancelled {
            execution_id: "e1".to_string(),
        };
        assert_eq!(err.to_string(), "cancelled");
    }
}
