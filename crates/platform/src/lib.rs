//! Remote platform client
//!
//! Typed access to the hosted agent platform: sessions, agents, tasks,
//! executions and their transitions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

pub mod http;
pub mod sse;

pub use http::HttpPlatform;

/// Platform call errors
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("platform returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited by platform")]
    RateLimited,

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Agent instructions: a single block or a list of lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Instructions {
    Many(Vec<String>),
    One(String),
}

impl Instructions {
    /// Instructions as one newline-joined string
    pub fn joined(&self) -> String {
        match self {
            Instructions::Many(lines) => lines.join("\n"),
            Instructions::One(text) => text.clone(),
        }
    }
}

impl From<String> for Instructions {
    fn from(text: String) -> Self {
        Instructions::One(text)
    }
}

impl From<&str> for Instructions {
    fn from(text: &str) -> Self {
        Instructions::One(text.to_string())
    }
}

/// Remote agent as returned by the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub instructions: Option<Instructions>,
}

impl Agent {
    /// Current instructions flattened to a string, empty when unset
    pub fn instructions_text(&self) -> String {
        self.instructions
            .as_ref()
            .map(Instructions::joined)
            .unwrap_or_default()
    }

    /// Definition carrying this agent's fields with replaced instructions
    pub fn with_instructions(&self, instructions: impl Into<Instructions>) -> AgentDefinition {
        AgentDefinition {
            name: self.name.clone(),
            about: self.about.clone(),
            instructions: Some(instructions.into()),
            model: self.model.clone(),
        }
    }
}

/// Body of an agent create-or-update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Instructions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Body of a task create-or-update; everything beyond the name is passed through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub name: String,
    #[serde(flatten)]
    pub body: serde_json::Map<String, Value>,
}

/// Remote task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Execution status reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Queued,
    Starting,
    Running,
    AwaitingInput,
    Succeeded,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl ExecutionStatus {
    /// Only success and failure end a poll
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Succeeded | ExecutionStatus::Failed)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionStatus::Queued => "queued",
            ExecutionStatus::Starting => "starting",
            ExecutionStatus::Running => "running",
            ExecutionStatus::AwaitingInput => "awaiting_input",
            ExecutionStatus::Succeeded => "succeeded",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
            ExecutionStatus::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Handle to a remote unit of work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub error: Option<String>,
}

impl Execution {
    pub fn new(id: impl Into<String>, status: ExecutionStatus) -> Self {
        Self {
            id: id.into(),
            status,
            error: None,
        }
    }
}

/// One step in an execution's history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Transition page, most recent first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionList {
    #[serde(default)]
    pub items: Vec<Transition>,
}

/// Document search options for a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallOptions {
    pub mode: String,
    pub confidence: f64,
    pub alpha: f64,
    pub mmr_strength: f64,
    pub limit: u32,
}

/// Session creation request
#[derive(Debug, Clone, Serialize)]
pub struct CreateSession {
    pub agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recall_options: Option<RecallOptions>,
}

impl CreateSession {
    pub fn for_agent(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            recall_options: None,
        }
    }

    pub fn with_recall(mut self, options: RecallOptions) -> Self {
        self.recall_options = Some(options);
        self
    }
}

/// Remote conversational context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat request parameters
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub recall: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub stream: bool,
}

impl ChatRequest {
    /// Single user message, no streaming
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(content)],
            recall: false,
            model: None,
            stream: false,
        }
    }

    pub fn with_recall(mut self, recall: bool) -> Self {
        self.recall = recall;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Document the platform retrieved while answering
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocReference {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

/// Complete chat reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub docs: Vec<DocReference>,
}

impl ChatResponse {
    /// Text of the first choice
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                message: ChoiceMessage {
                    content: Some(content.into()),
                },
            }],
            docs: Vec::new(),
        }
    }
}

/// One increment of a streamed reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatChunk {
    pub content: Option<String>,
    pub docs: Vec<DocReference>,
}

impl ChatChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            docs: Vec::new(),
        }
    }
}

/// Streamed chat reply
pub struct ChatStream {
    receiver: mpsc::Receiver<Result<ChatChunk>>,
}

impl ChatStream {
    pub fn new(receiver: mpsc::Receiver<Result<ChatChunk>>) -> Self {
        Self { receiver }
    }

    /// Stream that yields the given chunks and then ends
    pub fn from_chunks(chunks: Vec<ChatChunk>) -> Self {
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            // capacity covers every chunk
            let _ = tx.try_send(Ok(chunk));
        }
        Self::new(rx)
    }

    /// Next chunk, `None` once the platform closed the stream
    pub async fn next(&mut self) -> Option<Result<ChatChunk>> {
        self.receiver.recv().await
    }
}

impl fmt::Debug for ChatStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatStream").finish_non_exhaustive()
    }
}

/// Remote platform operations
#[async_trait]
pub trait Platform: Send + Sync {
    async fn create_session(&self, request: CreateSession) -> Result<Session>;
    async fn chat(&self, session_id: &str, request: ChatRequest) -> Result<ChatResponse>;
    async fn chat_stream(&self, session_id: &str, request: ChatRequest) -> Result<ChatStream>;
    async fn delete_session(&self, session_id: &str) -> Result<()>;

    async fn get_agent(&self, agent_id: &str) -> Result<Agent>;
    async fn create_or_update_agent(
        &self,
        agent_id: &str,
        definition: &AgentDefinition,
    ) -> Result<Agent>;
    async fn create_or_update_task(
        &self,
        agent_id: &str,
        task_id: &str,
        definition: &TaskDefinition,
    ) -> Result<Task>;

    async fn create_execution(&self, task_id: &str, input: Value) -> Result<Execution>;
    async fn get_execution(&self, execution_id: &str) -> Result<Execution>;
    async fn list_transitions(&self, execution_id: &str) -> Result<Vec<Transition>>;
}
