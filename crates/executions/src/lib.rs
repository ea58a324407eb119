//! Remote execution primitives
//!
//! Polling an execution until it reaches a terminal status, and retrying a
//! task execution a bounded number of times.

pub mod poller;
pub mod result;
pub mod retry;

pub use poller::{ExecutionPoller, PollConfig, PollError};
pub use result::{IndexingResult, IndexingStatus};
pub use retry::{RetryPolicy, TaskRunner};

pub use tokio_util::sync::CancellationToken;
