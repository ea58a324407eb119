//! Mocked platform shared by the job tests

#![allow(dead_code)]

use assistant_executions::PollConfig;
use assistant_platform::{
    Agent, AgentDefinition, ChatRequest, ChatResponse, ChatStream, CreateSession, Execution,
    Platform, PlatformError, Session, Task, TaskDefinition, Transition,
};
use async_trait::async_trait;
use mockall::mock;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

mock! {
    pub Platform {}

    #[async_trait]
    impl Platform for Platform {
        async fn create_session(&self, request: CreateSession) -> Result<Session, PlatformError>;
        async fn chat(&self, session_id: &str, request: ChatRequest) -> Result<ChatResponse, PlatformError>;
        async fn chat_stream(&self, session_id: &str, request: ChatRequest) -> Result<ChatStream, PlatformError>;
        async fn delete_session(&self, session_id: &str) -> Result<(), PlatformError>;
        async fn get_agent(&self, agent_id: &str) -> Result<Agent, PlatformError>;
        async fn create_or_update_agent(&self, agent_id: &str, definition: &AgentDefinition) -> Result<Agent, PlatformError>;
        async fn create_or_update_task(&self, agent_id: &str, task_id: &str, definition: &TaskDefinition) -> Result<Task, PlatformError>;
        async fn create_execution(&self, task_id: &str, input: Value) -> Result<Execution, PlatformError>;
        async fn get_execution(&self, execution_id: &str) -> Result<Execution, PlatformError>;
        async fn list_transitions(&self, execution_id: &str) -> Result<Vec<Transition>, PlatformError>;
    }
}

pub fn fast_poll() -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(5),
        max_wait: Some(Duration::from_secs(5)),
    }
}

pub fn transition(output: Value) -> Transition {
    Transition {
        id: None,
        kind: Some("finish".to_string()),
        output,
        created_at: None,
    }
}

pub fn write_definitions(dir: &Path) {
    std::fs::create_dir_all(dir.join("task")).unwrap();
    std::fs::write(
        dir.join("agent.yaml"),
        "name: Docs Assistant\nabout: Answers documentation questions\nmodel: claude-sonnet-4\ninstructions: Be precise.\n",
    )
    .unwrap();
    std::fs::write(dir.join("task/crawl.yaml"), "name: Crawl docs\nmain:\n  - tool: spider\n").unwrap();
    std::fs::write(dir.join("task/main.yaml"), "name: Index docs\nmain:\n  - prompt: index\n").unwrap();
}
