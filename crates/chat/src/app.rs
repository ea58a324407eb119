//! Chat handlers for one user connection

use std::sync::Arc;
use tracing::{debug, info, warn};

use assistant_bus::{Action, BusUi, ChatUi, Result, UiMessage, UserEvent};
use assistant_config::ChatConfig;
use assistant_feedback::{Exchange, FeedbackHandler, FeedbackKind};
use assistant_platform::{
    ChatRequest, CreateSession, DocReference, Platform, PlatformError, RecallOptions,
};

use crate::examples::{example_actions, example_for};

const ASSISTANT_AUTHOR: &str = "Julep Assistant";

const WELCOME: &str = "**Welcome to Julep AI Assistant!**

This assistant is a documentation helper built on Julep. It shows:

• **RAG (Retrieval-Augmented Generation)**: answers are grounded in a search over Julep's documentation
• **Self-Improving Feedback Loop**: your feedback can rewrite the agent's instructions
• **Stateful Sessions**: the conversation keeps its context between questions
• **Hybrid Search**: vector and text search combined for document retrieval

**📚 Resources:**
- [Source code on GitHub](https://github.com/julep-ai/julep-assistant)
- [Tutorial in the docs](https://docs.julep.ai/tutorials/julep-assistant)

**How I can help you:**
- Writing and debugging Julep workflows
- Understanding Julep concepts (agents, tasks, sessions, tools, etc.)
- Providing code examples
- Explaining API usage and best practices
- Troubleshooting and optimization tips

💡 **Tip**: Use the feedback buttons (👍/👎) on my responses to help me improve!
";

const PROMPT: &str = "**You can ask me anything about Julep!**\n\nOr use the quick actions below:";
const NO_SESSION: &str = "Session not found. Please refresh the page to start a new session.";

/// Shared, read-only state for every connection
pub struct AppContext {
    platform: Arc<dyn Platform>,
    feedback: FeedbackHandler,
    agent_id: String,
    config: ChatConfig,
}

impl AppContext {
    pub fn new(platform: Arc<dyn Platform>, agent_id: impl Into<String>, config: ChatConfig) -> Self {
        let agent_id = agent_id.into();
        let feedback = FeedbackHandler::new(platform.clone(), agent_id.clone(), config.feedback.clone());
        Self {
            platform,
            feedback,
            agent_id,
            config,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn feedback(&self) -> &FeedbackHandler {
        &self.feedback
    }

    fn recall_options(&self) -> RecallOptions {
        let recall = &self.config.recall;
        RecallOptions {
            mode: recall.mode.clone(),
            confidence: recall.confidence,
            alpha: recall.alpha,
            mmr_strength: recall.mmr_strength,
            limit: recall.limit,
        }
    }
}

/// Per-connection state threaded through every handler
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    pub session_id: Option<String>,
    pub last_exchange: Option<Exchange>,
}

/// Chat event handlers
#[derive(Clone)]
pub struct ChatApp {
    ctx: Arc<AppContext>,
}

impl ChatApp {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// Greet the user and open a remote session
    pub async fn start(&self, ui: &dyn ChatUi) -> Result<ChatSession> {
        ui.send(UiMessage::assistant(WELCOME)).await?;

        let mut session = ChatSession::default();
        let request = CreateSession::for_agent(&self.ctx.agent_id).with_recall(self.ctx.recall_options());
        match self.ctx.platform.create_session(request).await {
            Ok(remote) => {
                info!("Created session {}", remote.id);
                session.session_id = Some(remote.id);
            }
            Err(e) => {
                warn!("Failed to create session: {}", e);
                ui.send(UiMessage::system(format!("Error: {e}"))).await?;
            }
        }

        ui.send(UiMessage::system(PROMPT).with_actions(example_actions()))
            .await?;
        Ok(session)
    }

    /// Stream the agent's answer to `content`
    pub async fn on_message(&self, session: &mut ChatSession, content: &str, ui: &dyn ChatUi) -> Result<()> {
        let Some(session_id) = session.session_id.clone() else {
            ui.send(UiMessage::system(NO_SESSION)).await?;
            return Ok(());
        };

        let mut reply = UiMessage::new(ASSISTANT_AUTHOR, "");
        ui.send(reply.clone()).await?;

        let docs = match self.stream_reply(&session_id, content, &mut reply, ui).await {
            Ok(docs) => docs,
            Err(StreamError::Ui(e)) => return Err(e),
            Err(StreamError::Platform(e)) => {
                warn!("Chat failed: {}", e);
                ui.send(UiMessage::system(format!("Error: {e}"))).await?;
                return Ok(());
            }
        };

        session.last_exchange = Some(Exchange {
            question: content.to_string(),
            response: reply.content.clone(),
        });

        reply.actions = self.ctx.feedback.actions();
        ui.update(reply).await?;

        if !docs.is_empty() {
            ui.send(UiMessage::system(format!(
                "\n\n📚 **Referenced {} documentation sources**",
                docs.len()
            )))
            .await?;
        }
        Ok(())
    }

    async fn stream_reply(
        &self,
        session_id: &str,
        content: &str,
        reply: &mut UiMessage,
        ui: &dyn ChatUi,
    ) -> std::result::Result<Vec<DocReference>, StreamError> {
        let request = ChatRequest::user(content)
            .with_recall(true)
            .with_model(&self.ctx.config.model);
        let mut stream = self.ctx.platform.chat_stream(session_id, request).await?;

        let mut docs = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(token) = chunk.content.filter(|t| !t.is_empty()) {
                ui.stream_token(&reply.id, &token).await?;
                reply.content.push_str(&token);
            }
            if !chunk.docs.is_empty() {
                docs = chunk.docs;
            }
        }
        Ok(docs)
    }

    /// Example snippets and feedback buttons
    pub async fn on_action(&self, session: &mut ChatSession, action: &Action, ui: &dyn ChatUi) -> Result<()> {
        if let Some(snippet) = example_for(action) {
            return ui.send(UiMessage::assistant(snippet)).await;
        }

        let Some(kind) = FeedbackKind::from_action(action) else {
            debug!("Unhandled action {}", action.name);
            return Ok(());
        };
        let Some(exchange) = session.last_exchange.as_ref() else {
            debug!("Feedback without a previous answer ignored");
            return Ok(());
        };

        let outcome = self
            .ctx
            .feedback
            .handle_action(kind, exchange, session.session_id.as_deref(), ui)
            .await;
        match outcome {
            Ok(Some(outcome)) => info!("Feedback {}: {}", kind.value(), outcome.status),
            Ok(None) => {}
            Err(assistant_feedback::FeedbackError::Ui(e)) => return Err(e),
            Err(e) => warn!("Feedback failed: {}", e),
        }
        Ok(())
    }

    /// Delete the remote session, ignoring failures
    pub async fn end(&self, session: &mut ChatSession) {
        if let Some(session_id) = session.session_id.take() {
            match self.ctx.platform.delete_session(&session_id).await {
                Ok(()) => debug!("Session {} closed", session_id),
                Err(e) => warn!("Failed to delete session {}: {}", session_id, e),
            }
        }
    }

    /// Handle events from `ui` until the user leaves
    pub async fn run(&self, ui: &BusUi) -> Result<()> {
        let mut session = self.start(ui).await?;

        let result = loop {
            let Some(event) = ui.next_event().await else {
                break Ok(());
            };
            let handled = match event {
                UserEvent::Message { content } => self.on_message(&mut session, &content, ui).await,
                UserEvent::Action(action) => self.on_action(&mut session, &action, ui).await,
                UserEvent::End => break Ok(()),
            };
            if let Err(e) = handled {
                break Err(e);
            }
        };

        self.end(&mut session).await;
        result
    }
}

enum StreamError {
    Platform(PlatformError),
    Ui(assistant_bus::UiError),
}

impl From<PlatformError> for StreamError {
    fn from(e: PlatformError) -> Self {
        StreamError::Platform(e)
    }
}

impl From<assistant_bus::UiError> for StreamError {
    fn from(e: assistant_bus::UiError) -> Self {
        StreamError::Ui(e)
    }
}
