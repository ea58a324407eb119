//! One-shot crawl of a documentation site

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use assistant_executions::{CancellationToken, ExecutionPoller};
use assistant_platform::Platform;

use crate::{JobError, Result};

/// File the crawl output is written to inside the output directory
pub const CRAWL_OUTPUT_FILE: &str = "spider_crawler_output.json";

#[derive(Debug, Clone, PartialEq)]
pub struct CrawlOutcome {
    pub execution_id: String,
    pub output: Value,
}

/// Runs the crawl task for one URL and returns its final output
pub struct CrawlDriver {
    platform: Arc<dyn Platform>,
    poller: ExecutionPoller,
    task_id: String,
}

impl CrawlDriver {
    pub fn new(platform: Arc<dyn Platform>, poller: ExecutionPoller, task_id: impl Into<String>) -> Self {
        Self {
            platform,
            poller,
            task_id: task_id.into(),
        }
    }

    /// Execute, wait for success, then read the most recent transition
    ///
    /// No retries: any failure ends the crawl.
    pub async fn crawl(&self, url: &str, cancel: &CancellationToken) -> Result<CrawlOutcome> {
        info!("Starting crawl task for URL: {}", url);
        let execution = self
            .platform
            .create_execution(&self.task_id, json!({ "url": url }))
            .await?;
        info!("Execution ID: {}", execution.id);

        self.poller.poll(&execution.id, cancel).await?;

        info!("Retrieving crawler output...");
        let transitions = self.platform.list_transitions(&execution.id).await?;
        let latest = transitions
            .into_iter()
            .next()
            .ok_or_else(|| JobError::NoTransitions(execution.id.clone()))?;

        Ok(CrawlOutcome {
            execution_id: execution.id,
            output: latest.output,
        })
    }
}

/// Write the output as indented JSON, creating the directory when needed
pub async fn save_output(output: &Value, output_dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;
    let path = output_dir.join(CRAWL_OUTPUT_FILE);
    let content = serde_json::to_string_pretty(output)?;
    tokio::fs::write(&path, content).await?;
    info!("Output saved to: {}", path.display());
    Ok(path)
}
