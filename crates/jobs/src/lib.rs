//! Crawl and index batch jobs
//!
//! Both jobs deploy the agent and task definitions kept on disk, then drive
//! remote executions to completion: the crawl job runs one execution and
//! saves its output, the index job runs the indexing task once per crawled
//! document and writes a summary report.

use std::path::PathBuf;
use thiserror::Error;

use assistant_executions::PollError;
use assistant_platform::PlatformError;

pub mod crawl;
pub mod definitions;
pub mod index;
pub mod normalize;
pub mod summary;

pub use crawl::{CrawlDriver, CrawlOutcome, CRAWL_OUTPUT_FILE};
pub use definitions::{ensure_deployed, Definitions, Deployment};
pub use index::Indexer;
pub use normalize::{load_crawler_output, normalize, CrawlDocument, Normalized};
pub use summary::{ConsoleSummary, IndexSummary};

#[derive(Error, Debug)]
pub enum JobError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("definition file {} not found", .0.display())]
    MissingDefinition(PathBuf),

    #[error("invalid definition {}: {source}", .path.display())]
    InvalidDefinition {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("File '{}' not found", .0.display())]
    InputNotFound(PathBuf),

    #[error("invalid crawler output {}: {source}", .path.display())]
    InvalidInput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("execution {0} has no transitions")]
    NoTransitions(String),
}

pub type Result<T> = std::result::Result<T, JobError>;
