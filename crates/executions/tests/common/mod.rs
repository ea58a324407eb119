//! Shared test helpers: a mocked platform with scripted execution statuses

#![allow(dead_code)]

use assistant_platform::{
    Agent, AgentDefinition, ChatRequest, ChatResponse, ChatStream, CreateSession, Execution,
    ExecutionStatus, Platform, PlatformError, Session, Task, TaskDefinition, Transition,
};
use assistant_executions::PollConfig;
use async_trait::async_trait;
use mockall::mock;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
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

/// Poll quickly so tests stay fast
pub fn fast_poll() -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(5),
        max_wait: None,
    }
}

/// Answers `get_execution` with the given statuses in order, repeating the last one
pub fn script_statuses(mock: &mut MockPlatform, statuses: Vec<ExecutionStatus>) {
    let script = Mutex::new(VecDeque::from(statuses));
    mock.expect_get_execution().returning(move |id| {
        let mut script = script.lock().unwrap();
        let status = if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            *script.front().unwrap()
        };
        Ok(Execution::new(id, status))
    });
}
