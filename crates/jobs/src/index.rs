//! Sequential indexing of crawled documents

use std::time::Duration;
use tracing::{info, warn};

use assistant_executions::{CancellationToken, IndexingResult, TaskRunner};

use crate::normalize::CrawlDocument;

/// Runs the indexing task once per document, one document at a time
pub struct Indexer {
    runner: TaskRunner,
    item_delay: Duration,
}

impl Indexer {
    pub fn new(runner: TaskRunner, item_delay: Duration) -> Self {
        Self { runner, item_delay }
    }

    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    /// Index every document and return one result per document, in order
    ///
    /// After cancellation the remaining documents are reported as failed
    /// without contacting the platform.
    pub async fn process_all(
        &self,
        documents: &[CrawlDocument],
        cancel: &CancellationToken,
    ) -> Vec<IndexingResult> {
        let total = documents.len();
        info!("Processing {} documents for indexing...", total);

        let mut results = Vec::with_capacity(total);
        for (i, doc) in documents.iter().enumerate() {
            if cancel.is_cancelled() {
                results.push(IndexingResult::failed(&doc.url, "cancelled", 0));
                continue;
            }

            info!("Indexing document {}/{}", i + 1, total);
            let result = self
                .runner
                .run_with_retry(&doc.url, &doc.content, cancel)
                .await;
            if result.is_success() {
                info!("Successfully indexed: {}", doc.url);
            } else {
                warn!("Failed to index: {}", doc.url);
            }
            results.push(result);

            if i + 1 < total {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.item_delay) => {}
                }
            }
        }

        results
    }
}
