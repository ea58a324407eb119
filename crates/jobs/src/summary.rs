//! Indexing job summary, written to disk and printed

use chrono::{DateTime, Local};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use assistant_executions::IndexingResult;

use crate::Result;

const RULE: usize = 60;
const SECTION_RULE: usize = 40;

fn iso(timestamp: &DateTime<Local>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Results of one indexing run
#[derive(Debug, Clone)]
pub struct IndexSummary {
    pub agent_id: Option<String>,
    pub task_id: Option<String>,
    pub results: Vec<IndexingResult>,
    pub generated_at: DateTime<Local>,
}

impl IndexSummary {
    pub fn new(
        agent_id: Option<String>,
        task_id: Option<String>,
        results: Vec<IndexingResult>,
    ) -> Self {
        Self {
            agent_id,
            task_id,
            results,
            generated_at: Local::now(),
        }
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &IndexingResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &IndexingResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn succeeded_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn file_name(&self) -> String {
        format!(
            "indexing_summary_{}.txt",
            self.generated_at.format("%Y%m%d_%H%M%S")
        )
    }

    /// Full report as stored in the summary file
    pub fn render_report(&self) -> String {
        self.to_string()
    }

    /// Short form for the terminal
    pub fn console(&self) -> ConsoleSummary<'_> {
        ConsoleSummary(self)
    }

    pub fn render_console(&self) -> String {
        self.console().to_string()
    }

    /// Write the report into `dir`, creating it when needed
    pub async fn save(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(self.file_name());
        tokio::fs::write(&path, self.render_report()).await?;
        info!("Summary saved to: {}", path.display());
        Ok(path)
    }
}

impl fmt::Display for IndexSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let succeeded = self.succeeded_count();
        let failed = self.failed_count();

        writeln!(f, "INDEXING JOB SUMMARY")?;
        writeln!(f, "{}", "=".repeat(RULE))?;
        writeln!(f, "Timestamp: {}", iso(&self.generated_at))?;
        writeln!(f, "Agent ID: {}", self.agent_id.as_deref().unwrap_or("N/A"))?;
        writeln!(f, "Task ID: {}", self.task_id.as_deref().unwrap_or("N/A"))?;
        writeln!(f)?;
        writeln!(f, "Total documents processed: {}", self.total())?;
        writeln!(f, "Succeeded: {}", succeeded)?;
        writeln!(f, "Failed: {}", failed)?;
        writeln!(f)?;

        if succeeded > 0 {
            writeln!(f, "SUCCESSFULLY INDEXED DOCUMENTS:")?;
            writeln!(f, "{}", "-".repeat(SECTION_RULE))?;
            for result in self.succeeded() {
                writeln!(f, "✓ {}", result.url)?;
                writeln!(
                    f,
                    "  Execution ID: {}",
                    result.execution_id.as_deref().unwrap_or("N/A")
                )?;
                writeln!(f, "  Timestamp: {}\n", iso(&result.timestamp))?;
            }
        }

        if failed > 0 {
            writeln!(f, "\nFAILED DOCUMENTS:")?;
            writeln!(f, "{}", "-".repeat(SECTION_RULE))?;
            for result in self.failed() {
                writeln!(f, "✗ {}", result.url)?;
                writeln!(f, "  Error: {}", error_text(result))?;
                writeln!(f, "  Attempts: {}", result.attempts)?;
                writeln!(f, "  Timestamp: {}\n", iso(&result.timestamp))?;
            }
        }

        Ok(())
    }
}

/// Console rendering of an [`IndexSummary`]
pub struct ConsoleSummary<'a>(&'a IndexSummary);

impl fmt::Display for ConsoleSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.0;
        writeln!(f, "{}", "=".repeat(RULE))?;
        writeln!(f, "INDEXING JOB SUMMARY")?;
        writeln!(f, "{}", "=".repeat(RULE))?;
        writeln!(f, "Total documents processed: {}", summary.total())?;
        writeln!(f, "Succeeded: {}", summary.succeeded_count())?;
        writeln!(f, "Failed: {}", summary.failed_count())?;

        if summary.failed_count() > 0 {
            writeln!(f, "\nFailed Documents:")?;
            for result in summary.failed() {
                writeln!(f, "  - {}: {}", result.url, error_text(result))?;
            }
        }
        Ok(())
    }
}

fn error_text(result: &IndexingResult) -> &str {
    result.error.as_deref().unwrap_or("Unknown error")
}
