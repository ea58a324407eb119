//! Chat UI bus
//!
//! Events from the user (messages, action presses, disconnect) travel
//! inbound; frames for the user (messages, streamed tokens, updates) travel
//! outbound. `BusUi` gives chat handlers a `ChatUi` on top of the two
//! channels so the same handlers can drive any front end.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace};

pub const AUTHOR_ASSISTANT: &str = "assistant";
pub const AUTHOR_SYSTEM: &str = "system";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UiError {
    #[error("UI channel closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, UiError>;

/// Named button attached to a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub payload: HashMap<String, serde_json::Value>,
}

impl Action {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            description: None,
            payload: HashMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a payload entry; values that fail to serialize are skipped
    pub fn with_payload(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.payload.insert(key.into(), value);
        }
        self
    }

    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }
}

/// Something the user did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserEvent {
    Message { content: String },
    Action(Action),
    End,
}

impl UserEvent {
    pub fn message(content: impl Into<String>) -> Self {
        UserEvent::Message {
            content: content.into(),
        }
    }
}

/// Message shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiMessage {
    pub id: String,
    pub author: String,
    pub content: String,
    #[serde(default)]
    pub actions: Vec<Action>,
    pub timestamp: DateTime<Local>,
}

impl UiMessage {
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            author: author.into(),
            content: content.into(),
            actions: Vec::new(),
            timestamp: Local::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(AUTHOR_ASSISTANT, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(AUTHOR_SYSTEM, content)
    }

    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }
}

/// Output for the front end to render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiFrame {
    /// A new message, possibly empty when tokens follow
    Message(UiMessage),
    /// Text appended to an earlier message
    Token { message_id: String, token: String },
    /// Replacement of an earlier message with the same id
    Update(UiMessage),
}

pub type InboundSender = mpsc::UnboundedSender<UserEvent>;
pub type InboundReceiver = mpsc::UnboundedReceiver<UserEvent>;
pub type OutboundSender = mpsc::UnboundedSender<UiFrame>;
pub type OutboundReceiver = mpsc::UnboundedReceiver<UiFrame>;

/// Both ends of the UI channels
#[derive(Debug, Clone)]
pub struct MessageBus {
    inbound: InboundSender,
    outbound: OutboundSender,
}

impl MessageBus {
    pub fn new(inbound: InboundSender, outbound: OutboundSender) -> Self {
        Self { inbound, outbound }
    }

    pub fn channels() -> (Self, InboundReceiver, OutboundReceiver) {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        (Self::new(in_tx, out_tx), in_rx, out_rx)
    }

    pub fn publish_inbound(&self, event: UserEvent) -> Result<()> {
        trace!("Inbound event: {:?}", event);
        self.inbound.send(event).map_err(|_| UiError::Closed)
    }

    pub fn publish_outbound(&self, frame: UiFrame) -> Result<()> {
        self.outbound.send(frame).map_err(|_| UiError::Closed)
    }

    pub fn inbound_sender(&self) -> InboundSender {
        self.inbound.clone()
    }

    pub fn outbound_sender(&self) -> OutboundSender {
        self.outbound.clone()
    }
}

/// What chat handlers can do with the user's screen
#[async_trait]
pub trait ChatUi: Send + Sync {
    async fn send(&self, message: UiMessage) -> Result<()>;
    async fn stream_token(&self, message_id: &str, token: &str) -> Result<()>;
    async fn update(&self, message: UiMessage) -> Result<()>;

    /// Show `prompt` and wait for the user's next message; `None` on timeout
    async fn ask(&self, prompt: &str, timeout: Duration) -> Result<Option<String>>;
}

/// `ChatUi` over the bus channels
pub struct BusUi {
    outbound: OutboundSender,
    inbound: Mutex<InboundReceiver>,
    closed: AtomicBool,
}

impl BusUi {
    pub fn new(outbound: OutboundSender, inbound: InboundReceiver) -> Self {
        Self {
            outbound,
            inbound: Mutex::new(inbound),
            closed: AtomicBool::new(false),
        }
    }

    fn emit(&self, frame: UiFrame) -> Result<()> {
        self.outbound.send(frame).map_err(|_| UiError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Next user event; `None` once the user has left
    pub async fn next_event(&self) -> Option<UserEvent> {
        if self.is_closed() {
            return None;
        }

        let event = self.inbound.lock().await.recv().await;
        match event {
            Some(UserEvent::End) | None => {
                self.closed.store(true, Ordering::SeqCst);
                Some(UserEvent::End)
            }
            other => other,
        }
    }
}

#[async_trait]
impl ChatUi for BusUi {
    async fn send(&self, message: UiMessage) -> Result<()> {
        self.emit(UiFrame::Message(message))
    }

    async fn stream_token(&self, message_id: &str, token: &str) -> Result<()> {
        self.emit(UiFrame::Token {
            message_id: message_id.to_string(),
            token: token.to_string(),
        })
    }

    async fn update(&self, message: UiMessage) -> Result<()> {
        self.emit(UiFrame::Update(message))
    }

    async fn ask(&self, prompt: &str, timeout: Duration) -> Result<Option<String>> {
        if self.is_closed() {
            return Err(UiError::Closed);
        }
        self.emit(UiFrame::Message(UiMessage::assistant(prompt)))?;

        let mut inbound = self.inbound.lock().await;
        let wait = async {
            loop {
                match inbound.recv().await {
                    Some(UserEvent::Message { content }) => return Some(content),
                    Some(UserEvent::Action(action)) => {
                        debug!("Ignoring action {} while waiting for an answer", action.name);
                    }
                    Some(UserEvent::End) | None => {
                        self.closed.store(true, Ordering::SeqCst);
                        return None;
                    }
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(answer) => Ok(answer),
            Err(_) => {
                debug!("No answer within {:?}", timeout);
                Ok(None)
            }
        }
    }
}

/// Drains outbound frames into a renderer
pub struct OutboundDispatcher {
    receiver: OutboundReceiver,
}

impl OutboundDispatcher {
    pub fn new(receiver: OutboundReceiver) -> Self {
        Self { receiver }
    }

    /// Hand every frame to `handler` in order until all senders are gone
    pub async fn run<F>(mut self, mut handler: F)
    where
        F: FnMut(UiFrame) + Send,
    {
        debug!("UI dispatcher started");

        while let Some(frame) = self.receiver.recv().await {
            handler(frame);
        }

        debug!("UI dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_builder() {
        let action = Action::new("example", "Agent example")
            .with_description("Show a sample agent definition")
            .with_payload("example_type", "agent");

        assert_eq!(action.name, "example");
        assert_eq!(action.payload_str("example_type"), Some("agent"));
        assert_eq!(action.payload_str("missing"), None);
        assert_eq!(
            action.description.as_deref(),
            Some("Show a sample agent definition")
        );
    }

    #[test]
    fn test_user_event_tagging() {
        let event = UserEvent::message("hi");
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "message", "content": "hi"})
        );

        let end: UserEvent = serde_json::from_value(json!({"type": "end"})).unwrap();
        assert_eq!(end, UserEvent::End);
    }

    #[test]
    fn test_ui_message_ids_are_unique() {
        let a = UiMessage::assistant("a");
        let b = UiMessage::assistant("a");
        assert_ne!(a.id, b.id);
        assert_eq!(a.author, AUTHOR_ASSISTANT);
        assert_eq!(UiMessage::system("x").author, AUTHOR_SYSTEM);
    }

    #[tokio::test]
    async fn test_publish_after_receiver_dropped() {
        let (bus, in_rx, out_rx) = MessageBus::channels();
        drop(in_rx);
        drop(out_rx);

        assert_eq!(bus.publish_inbound(UserEvent::End), Err(UiError::Closed));
        assert_eq!(
            bus.publish_outbound(UiFrame::Message(UiMessage::system("x"))),
            Err(UiError::Closed)
        );
    }
}
