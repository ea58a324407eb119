//! Per-document indexing outcome

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexingStatus {
    Succeeded,
    Failed,
}

impl fmt::Display for IndexingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexingStatus::Succeeded => f.write_str("succeeded"),
            IndexingStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Outcome of running the indexing task for one URL
///
/// Records are only built through [`IndexingResult::succeeded`] and
/// [`IndexingResult::failed`] and are never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexingResult {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    pub status: IndexingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: u32,
    pub timestamp: DateTime<Local>,
}

impl IndexingResult {
    pub fn succeeded(url: impl Into<String>, execution_id: impl Into<String>, attempts: u32) -> Self {
        Self {
            url: url.into(),
            execution_id: Some(execution_id.into()),
            status: IndexingStatus::Succeeded,
            error: None,
            attempts,
            timestamp: Local::now(),
        }
    }

    pub fn failed(url: impl Into<String>, error: impl Into<String>, attempts: u32) -> Self {
        Self {
            url: url.into(),
            execution_id: None,
            status: IndexingStatus::Failed,
            error: Some(error.into()),
            attempts,
            timestamp: Local::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == IndexingStatus::Succeeded
    }
}
