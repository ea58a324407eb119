//! HTTP implementation of the platform API

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::sse;
use crate::*;

/// Platform client over HTTPS with bearer authentication
pub struct HttpPlatform {
    client: Client,
    api_key: String,
    api_base: String,
}

impl HttpPlatform {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        debug!("Platform error {}: {}", status, message);

        match status.as_u16() {
            404 => Err(PlatformError::NotFound(message)),
            429 => Err(PlatformError::RateLimited),
            code => Err(PlatformError::Api {
                status: code,
                message,
            }),
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Best human-readable message in an error body
fn error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let candidates = [
            json["detail"].as_str(),
            json["error"]["message"].as_str(),
            json["error"].as_str(),
            json["message"].as_str(),
        ];
        if let Some(message) = candidates.into_iter().flatten().next() {
            return message.to_string();
        }
    }

    if body.trim().is_empty() {
        "no response body".to_string()
    } else {
        body.trim().to_string()
    }
}

#[async_trait]
impl Platform for HttpPlatform {
    async fn create_session(&self, request: CreateSession) -> Result<Session> {
        trace!("Creating session for agent {}", request.agent);
        let builder = self.client.post(self.url("sessions")).json(&request);
        self.send_json(builder).await
    }

    async fn chat(&self, session_id: &str, mut request: ChatRequest) -> Result<ChatResponse> {
        request.stream = false;
        let url = self.url(&format!("sessions/{session_id}/chat"));
        self.send_json(self.client.post(url).json(&request)).await
    }

    async fn chat_stream(&self, session_id: &str, mut request: ChatRequest) -> Result<ChatStream> {
        request.stream = true;
        let url = self.url(&format!("sessions/{session_id}/chat"));
        let response = self
            .send(
                self.client
                    .post(url)
                    .header("Accept", "text/event-stream")
                    .json(&request),
            )
            .await?;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(sse::forward_events(response.bytes_stream(), tx));
        Ok(ChatStream::new(rx))
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let url = self.url(&format!("sessions/{session_id}"));
        self.send(self.client.delete(url)).await?;
        debug!("Deleted session {}", session_id);
        Ok(())
    }

    async fn get_agent(&self, agent_id: &str) -> Result<Agent> {
        let url = self.url(&format!("agents/{agent_id}"));
        self.send_json(self.client.get(url)).await
    }

    async fn create_or_update_agent(
        &self,
        agent_id: &str,
        definition: &AgentDefinition,
    ) -> Result<Agent> {
        let url = self.url(&format!("agents/{agent_id}"));
        self.send_json(self.client.post(url).json(definition)).await
    }

    async fn create_or_update_task(
        &self,
        agent_id: &str,
        task_id: &str,
        definition: &TaskDefinition,
    ) -> Result<Task> {
        let url = self.url(&format!("agents/{agent_id}/tasks/{task_id}"));
        self.send_json(self.client.post(url).json(definition)).await
    }

    async fn create_execution(&self, task_id: &str, input: Value) -> Result<Execution> {
        let url = self.url(&format!("tasks/{task_id}/executions"));
        let execution: Execution = self
            .send_json(self.client.post(url).json(&json!({ "input": input })))
            .await?;
        debug!("Created execution {} for task {}", execution.id, task_id);
        Ok(execution)
    }

    async fn get_execution(&self, execution_id: &str) -> Result<Execution> {
        let url = self.url(&format!("executions/{execution_id}"));
        self.send_json(self.client.get(url)).await
    }

    async fn list_transitions(&self, execution_id: &str) -> Result<Vec<Transition>> {
        let url = self.url(&format!("executions/{execution_id}/transitions"));
        let page: TransitionList = self.send_json(self.client.get(url)).await?;
        if page.items.is_empty() {
            warn!("Execution {} has no transitions", execution_id);
        }
        Ok(page.items)
    }
}
