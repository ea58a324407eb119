//! Feedback actions and applying validated feedback to the agent

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use assistant_bus::{Action, ChatUi, UiMessage};
use assistant_config::FeedbackConfig;
use assistant_platform::Platform;

use crate::validator::{FeedbackRecord, FeedbackValidator, ValidationResult};
use crate::Result;

const HELPFUL_FEEDBACK: &str = "The response was helpful and answered my question well.";
const HELPFUL_THANKS: &str = "Thank you for your positive feedback! 🎉";
const NOT_HELPFUL_PROMPT: &str = "What specifically could be improved about this response?";
const DETAILED_PROMPT: &str =
    "Please provide your detailed feedback. What worked well? What could be improved?";

const PAYLOAD_VALUE: &str = "value";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Success,
    Acknowledged,
    NotApplied,
    Error,
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeedbackStatus::Success => "success",
            FeedbackStatus::Acknowledged => "acknowledged",
            FeedbackStatus::NotApplied => "not_applied",
            FeedbackStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// Result of one validate-and-apply round
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackOutcome {
    pub status: FeedbackStatus,
    pub message: String,
    pub validation: Option<ValidationResult>,
}

/// The three feedback buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Helpful,
    NotHelpful,
    Detailed,
}

impl FeedbackKind {
    pub const ALL: [FeedbackKind; 3] = [
        FeedbackKind::Helpful,
        FeedbackKind::NotHelpful,
        FeedbackKind::Detailed,
    ];

    pub fn value(&self) -> &'static str {
        match self {
            FeedbackKind::Helpful => "helpful",
            FeedbackKind::NotHelpful => "not_helpful",
            FeedbackKind::Detailed => "detailed",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.value() == value)
    }

    /// Kind carried by a pressed feedback button
    pub fn from_action(action: &Action) -> Option<Self> {
        if !action.name.starts_with("feedback_") {
            return None;
        }
        action.payload_str(PAYLOAD_VALUE).and_then(Self::from_value)
    }

    pub fn action(&self) -> Action {
        let label = match self {
            FeedbackKind::Helpful => "👍 Helpful",
            FeedbackKind::NotHelpful => "👎 Not Helpful",
            FeedbackKind::Detailed => "💭 Give Detailed Feedback",
        };
        Action::new(format!("feedback_{}", self.value()), label)
            .with_payload(PAYLOAD_VALUE, self.value())
    }
}

/// The question and answer feedback refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub question: String,
    pub response: String,
}

/// Stateless apart from its immutable platform handle; shared across sessions
pub struct FeedbackHandler {
    platform: Arc<dyn Platform>,
    validator: FeedbackValidator,
    agent_id: String,
    config: FeedbackConfig,
}

impl FeedbackHandler {
    pub fn new(platform: Arc<dyn Platform>, agent_id: impl Into<String>, config: FeedbackConfig) -> Self {
        let agent_id = agent_id.into();
        let validator =
            FeedbackValidator::new(platform.clone(), agent_id.clone(), &config.validation_model);
        Self {
            platform,
            validator,
            agent_id,
            config,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Buttons to attach under an answer
    pub fn actions(&self) -> Vec<Action> {
        FeedbackKind::ALL.iter().map(FeedbackKind::action).collect()
    }

    /// Validate `record` and rewrite the agent's instructions when warranted
    ///
    /// Never fails; problems are reported with [`FeedbackStatus::Error`].
    pub async fn validate_and_apply(&self, record: &FeedbackRecord) -> FeedbackOutcome {
        match self.try_apply(record).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Error processing feedback: {}", e);
                FeedbackOutcome {
                    status: FeedbackStatus::Error,
                    message: format!("An error occurred while processing your feedback: {e}"),
                    validation: None,
                }
            }
        }
    }

    async fn try_apply(&self, record: &FeedbackRecord) -> Result<FeedbackOutcome> {
        let agent = self.platform.get_agent(&self.agent_id).await?;
        let instructions = agent.instructions_text();

        let validation = self.validator.validate(record, &instructions).await?;
        let threshold = self.config.confidence_threshold;

        if !validation.meets(threshold) {
            info!("Feedback not applied: {}", validation.reasoning);
            return Ok(FeedbackOutcome {
                status: FeedbackStatus::NotApplied,
                message: "Thank you for your feedback. While we appreciate your input, this feedback doesn't meet our criteria for automatic application.".to_string(),
                validation: Some(validation),
            });
        }

        let Some(updated) = validation.applicable_instructions(threshold) else {
            return Ok(FeedbackOutcome {
                status: FeedbackStatus::Acknowledged,
                message: "Thank you for your feedback. We've noted your input for future improvements.".to_string(),
                validation: Some(validation),
            });
        };

        let category = validation.category_name();
        info!("Applying feedback with category: {}", category);
        self.platform
            .create_or_update_agent(&self.agent_id, &agent.with_instructions(updated))
            .await?;
        info!("Applied feedback to agent instructions: {}", category);

        Ok(FeedbackOutcome {
            status: FeedbackStatus::Success,
            message: format!("Thank you! Your feedback has been applied. Category: {category}"),
            validation: Some(validation),
        })
    }

    fn record(&self, feedback_text: String, exchange: &Exchange, session_id: Option<&str>) -> FeedbackRecord {
        FeedbackRecord {
            feedback_text,
            user_question: exchange.question.clone(),
            agent_response: exchange.response.clone(),
            session_id: session_id.map(str::to_string),
        }
    }

    /// Run the flow for a pressed feedback button
    ///
    /// Returns `None` when the user did not answer a prompt in time.
    pub async fn handle_action(
        &self,
        kind: FeedbackKind,
        exchange: &Exchange,
        session_id: Option<&str>,
        ui: &dyn ChatUi,
    ) -> Result<Option<FeedbackOutcome>> {
        let (prompt, timeout) = match kind {
            FeedbackKind::Helpful => {
                let record = self.record(HELPFUL_FEEDBACK.to_string(), exchange, session_id);
                let outcome = self.validate_and_apply(&record).await;
                ui.send(UiMessage::system(HELPFUL_THANKS)).await?;
                return Ok(Some(outcome));
            }
            FeedbackKind::NotHelpful => (
                NOT_HELPFUL_PROMPT,
                Duration::from_secs(self.config.not_helpful_timeout_secs),
            ),
            FeedbackKind::Detailed => (
                DETAILED_PROMPT,
                Duration::from_secs(self.config.detailed_timeout_secs),
            ),
        };

        let Some(text) = ui.ask(prompt, timeout).await? else {
            info!("No {} feedback received", kind.value());
            return Ok(None);
        };

        let record = self.record(text, exchange, session_id);
        let outcome = self.validate_and_apply(&record).await;

        let message = match (&outcome.validation, kind, outcome.status) {
            (Some(validation), FeedbackKind::Detailed, FeedbackStatus::Success) => format!(
                "✅ {}\n\n**Analysis Details:**\n- Confidence: {:.2}\n- Reasoning: {}",
                outcome.message,
                validation.confidence,
                if validation.reasoning.is_empty() {
                    "N/A"
                } else {
                    validation.reasoning.as_str()
                }
            ),
            _ => outcome.message.clone(),
        };
        ui.send(UiMessage::system(message)).await?;

        Ok(Some(outcome))
    }
}
