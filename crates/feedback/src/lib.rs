//! User feedback loop
//!
//! Feedback on an answer is checked by a model against the agent's current
//! instructions. Confident, valid feedback that comes with rewritten
//! instructions replaces the agent's instructions on the platform.

use thiserror::Error;

use assistant_bus::UiError;
use assistant_platform::PlatformError;

pub mod handler;
pub mod validator;

pub use handler::{Exchange, FeedbackHandler, FeedbackKind, FeedbackOutcome, FeedbackStatus};
pub use validator::{
    build_prompt, parse_verdict, FeedbackCategory, FeedbackRecord, FeedbackValidator,
    ValidationResult,
};

#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("malformed verdict: {0}")]
    MalformedVerdict(String),

    #[error(transparent)]
    Ui(#[from] UiError),
}

pub type Result<T> = std::result::Result<T, FeedbackError>;
