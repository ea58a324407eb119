//! Model-backed validation of user feedback

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use assistant_platform::{ChatRequest, CreateSession, Platform};

use crate::{FeedbackError, Result};

const RESPONSE_PREVIEW_CHARS: usize = 1000;

/// One piece of feedback about one answer
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRecord {
    pub feedback_text: String,
    pub user_question: String,
    pub agent_response: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackCategory {
    Accuracy,
    Completeness,
    Clarity,
    Relevance,
    CodeQuality,
    #[serde(other)]
    Other,
}

impl fmt::Display for FeedbackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeedbackCategory::Accuracy => "accuracy",
            FeedbackCategory::Completeness => "completeness",
            FeedbackCategory::Clarity => "clarity",
            FeedbackCategory::Relevance => "relevance",
            FeedbackCategory::CodeQuality => "code_quality",
            FeedbackCategory::Other => "other",
        };
        f.write_str(name)
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// The validating model's verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub confidence: f64,
    #[serde(default)]
    pub category: Option<FeedbackCategory>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub updated_instructions: Option<String>,
}

impl ValidationResult {
    /// Invalid verdict with zero confidence
    pub fn rejected(reasoning: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            confidence: 0.0,
            category: None,
            reasoning: reasoning.into(),
            updated_instructions: None,
        }
    }

    pub fn meets(&self, threshold: f64) -> bool {
        self.is_valid && self.confidence >= threshold
    }

    /// Instructions to apply, present only for a confident valid verdict
    pub fn applicable_instructions(&self, threshold: f64) -> Option<&str> {
        if self.meets(threshold) {
            self.updated_instructions.as_deref()
        } else {
            None
        }
    }

    pub fn category_name(&self) -> String {
        self.category
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unspecified".to_string())
    }
}

fn preview(response: &str) -> String {
    let mut chars = response.chars();
    let head: String = chars.by_ref().take(RESPONSE_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Prompt asking the model for a JSON verdict on `record`
pub fn build_prompt(record: &FeedbackRecord, instructions: &str) -> String {
    format!(
        r#"You are reviewing user feedback on a Julep documentation assistant so that its instructions can be improved.

Current Agent Instructions:
{instructions}

User Question: {question}
Agent Response: {response}
User Feedback: {feedback}

Decide whether the feedback is valid and actionable. If it is, rewrite the agent's instructions so they address it.

Rewritten instructions must:
- Keep the existing structure and every current capability
- Add guidance that addresses the feedback
- Stay concise without repeating themselves
- Leave out the user's question and feedback text

Answer with a JSON object of this shape:
{{
    "is_valid": boolean,
    "confidence": 0.0-1.0,
    "category": "accuracy|completeness|clarity|relevance|code_quality|other",
    "reasoning": "Why the feedback is or is not valid",
    "updated_instructions": "The complete rewritten instructions, or null when no change is needed"
}}

Answer with the JSON object only."#,
        question = record.user_question,
        response = preview(&record.agent_response),
        feedback = record.feedback_text,
    )
}

const FENCE: &str = "```";

/// Content of the fenced block in a reply, or the reply itself
///
/// A reply that already starts with `{` is taken verbatim. Otherwise the
/// block runs from the first fence, past its language tag, to the last
/// fence, so fences inside the instructions survive.
fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        return trimmed;
    }
    let Some(open) = trimmed.find(FENCE) else {
        return trimmed;
    };

    let rest = &trimmed[open + FENCE.len()..];
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    let body = match rest.rfind(FENCE) {
        Some(close) => &rest[..close],
        None => rest,
    };
    body.trim()
}

/// Decode the model's reply into a verdict
pub fn parse_verdict(text: &str) -> Result<ValidationResult> {
    let verdict: ValidationResult = serde_json::from_str(strip_fence(text))
        .map_err(|e| FeedbackError::MalformedVerdict(e.to_string()))?;

    if !(0.0..=1.0).contains(&verdict.confidence) {
        return Err(FeedbackError::MalformedVerdict(format!(
            "confidence {} outside 0..1",
            verdict.confidence
        )));
    }
    Ok(verdict)
}

/// Asks a model to judge feedback through a throwaway session
pub struct FeedbackValidator {
    platform: Arc<dyn Platform>,
    agent_id: String,
    model: String,
}

impl FeedbackValidator {
    pub fn new(
        platform: Arc<dyn Platform>,
        agent_id: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            agent_id: agent_id.into(),
            model: model.into(),
        }
    }

    /// Platform failures are errors; an unreadable verdict is a rejection
    pub async fn validate(
        &self,
        record: &FeedbackRecord,
        instructions: &str,
    ) -> Result<ValidationResult> {
        let prompt = build_prompt(record, instructions);
        let session = self
            .platform
            .create_session(CreateSession::for_agent(&self.agent_id))
            .await?;
        debug!("Validation session {}", session.id);

        let request = ChatRequest::user(prompt)
            .with_recall(false)
            .with_model(&self.model);
        let reply = self.platform.chat(&session.id, request).await;

        if let Err(e) = self.platform.delete_session(&session.id).await {
            warn!("Failed to delete validation session {}: {}", session.id, e);
        }

        let reply = reply?;
        let content = reply.content().unwrap_or_default();
        match parse_verdict(content) {
            Ok(verdict) => Ok(verdict),
            Err(e) => {
                warn!("Failed to parse validation response: {}", e);
                Ok(ValidationResult::rejected(
                    "Failed to parse validation response",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(response: &str) -> FeedbackRecord {
        FeedbackRecord {
            feedback_text: "Show a complete YAML example".to_string(),
            user_question: "How do I define a task?".to_string(),
            agent_response: response.to_string(),
            session_id: None,
        }
    }

    #[test]
    fn test_prompt_contains_context() {
        let prompt = build_prompt(&record("Use a YAML file."), "Be precise.");
        assert!(prompt.contains("Current Agent Instructions:\nBe precise."));
        assert!(prompt.contains("User Question: How do I define a task?"));
        assert!(prompt.contains("Agent Response: Use a YAML file.\n"));
        assert!(prompt.contains("User Feedback: Show a complete YAML example"));
        assert!(prompt.contains("\"updated_instructions\""));
    }

    #[test]
    fn test_prompt_truncates_long_response() {
        let long = "é".repeat(1500);
        let prompt = build_prompt(&record(&long), "");
        let expected = format!("Agent Response: {}...\n", "é".repeat(1000));
        assert!(prompt.contains(&expected));

        let exact = "a".repeat(1000);
        let prompt = build_prompt(&record(&exact), "");
        assert!(prompt.contains(&format!("Agent Response: {exact}\n")));
    }

    #[test]
    fn test_parse_plain_verdict() {
        let verdict = parse_verdict(
            r#"{"is_valid": true, "confidence": 0.9, "category": "completeness",
                "reasoning": "Examples help", "updated_instructions": "X"}"#,
        )
        .unwrap();
        assert!(verdict.is_valid);
        assert_eq!(verdict.category, Some(FeedbackCategory::Completeness));
        assert_eq!(verdict.applicable_instructions(0.7), Some("X"));
    }

    #[test]
    fn test_parse_fenced_verdict() {
        let text = "```json\n{\"is_valid\": false, \"confidence\": 0.2, \"reasoning\": \"vague\"}\n```";
        let verdict = parse_verdict(text).unwrap();
        assert!(!verdict.is_valid);
        assert_eq!(verdict.reasoning, "vague");
        assert!(verdict.updated_instructions.is_none());
    }

    const VERDICT: &str = r#"{"is_valid": true, "confidence": 0.9, "updated_instructions": "X"}"#;

    #[test]
    fn test_parse_fence_after_prose() {
        let text = format!("Here is my assessment:\n\n```json\n{VERDICT}\n```");
        let verdict = parse_verdict(&text).unwrap();
        assert_eq!(verdict.applicable_instructions(0.7), Some("X"));
    }

    #[test]
    fn test_parse_fence_followed_by_prose() {
        let text = format!("```json\n{VERDICT}\n```\nLet me know if you need more.");
        let verdict = parse_verdict(&text).unwrap();
        assert_eq!(verdict.applicable_instructions(0.7), Some("X"));
    }

    #[test]
    fn test_parse_single_line_fence() {
        for text in [format!("```json {VERDICT}```"), format!("```{VERDICT}```")] {
            let verdict = parse_verdict(&text).unwrap();
            assert!(verdict.meets(0.7));
        }
    }

    #[test]
    fn test_parse_keeps_fences_inside_instructions() {
        let plain = r#"{"is_valid": true, "confidence": 0.8, "updated_instructions": "Use ```yaml\nmain: []\n``` blocks"}"#;
        let verdict = parse_verdict(plain).unwrap();
        assert!(verdict.applicable_instructions(0.7).unwrap().contains("```yaml"));

        let fenced = format!("```json\n{plain}\n```");
        let verdict = parse_verdict(&fenced).unwrap();
        assert!(verdict.applicable_instructions(0.7).unwrap().contains("```yaml"));
    }

    #[test]
    fn test_parse_unknown_category_and_empty_update() {
        let verdict = parse_verdict(
            r#"{"is_valid": true, "confidence": 1, "category": "tone", "updated_instructions": "  "}"#,
        )
        .unwrap();
        assert_eq!(verdict.category, Some(FeedbackCategory::Other));
        assert!(verdict.updated_instructions.is_none());
        assert_eq!(verdict.applicable_instructions(0.7), None);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            parse_verdict("I think the feedback is fair."),
            Err(FeedbackError::MalformedVerdict(_))
        ));
        assert!(matches!(
            parse_verdict(r#"{"confidence": 0.5}"#),
            Err(FeedbackError::MalformedVerdict(_))
        ));
        assert!(matches!(
            parse_verdict(r#"{"is_valid": true, "confidence": 1.5}"#),
            Err(FeedbackError::MalformedVerdict(_))
        ));
    }

    #[test]
    fn test_threshold_boundaries() {
        let mut verdict = ValidationResult::rejected("n/a");
        verdict.is_valid = true;
        verdict.updated_instructions = Some("X".to_string());

        verdict.confidence = 0.7;
        assert_eq!(verdict.applicable_instructions(0.7), Some("X"));
        verdict.confidence = 0.69;
        assert_eq!(verdict.applicable_instructions(0.7), None);

        verdict.confidence = 0.95;
        verdict.is_valid = false;
        assert_eq!(verdict.applicable_instructions(0.7), None);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(FeedbackCategory::CodeQuality.to_string(), "code_quality");
        assert_eq!(ValidationResult::rejected("x").category_name(), "unspecified");
    }
}
