//! Crawl driver against a mocked platform

mod common;

use assistant_executions::{CancellationToken, ExecutionPoller, PollError};
use assistant_jobs::crawl::save_output;
use assistant_jobs::{ensure_deployed, CrawlDriver, Definitions, JobError, CRAWL_OUTPUT_FILE};
use assistant_platform::{Agent, Execution, ExecutionStatus, Platform, Task};
use common::{fast_poll, transition, write_definitions, MockPlatform};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

fn driver(mock: MockPlatform) -> CrawlDriver {
    let platform: Arc<dyn Platform> = Arc::new(mock);
    let poller = ExecutionPoller::new(platform.clone(), fast_poll());
    CrawlDriver::new(platform, poller, "crawl-task")
}

#[tokio::test]
async fn test_crawl_returns_latest_transition_output() {
    let mut mock = MockPlatform::new();
    mock.expect_create_execution()
        .times(1)
        .withf(|task_id, input| task_id == "crawl-task" && *input == json!({"url": "https://docs.example.com"}))
        .returning(|_, _| Ok(Execution::new("e1", ExecutionStatus::Queued)));
    mock.expect_get_execution()
        .times(1)
        .returning(|id| Ok(Execution::new(id, ExecutionStatus::Succeeded)));
    mock.expect_list_transitions()
        .times(1)
        .withf(|id| id == "e1")
        .returning(|_| {
            Ok(vec![
                transition(json!([{"url": "https://docs.example.com", "content": "# Docs"}])),
                transition(json!("older step")),
            ])
        });

    let outcome = driver(mock)
        .crawl("https://docs.example.com", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.execution_id, "e1");
    assert_eq!(outcome.output[0]["content"], "# Docs");
}

#[tokio::test]
async fn test_crawl_fails_on_failed_execution() {
    let mut mock = MockPlatform::new();
    mock.expect_create_execution()
        .returning(|_, _| Ok(Execution::new("e1", ExecutionStatus::Queued)));
    mock.expect_get_execution()
        .returning(|id| Ok(Execution::new(id, ExecutionStatus::Failed)));
    mock.expect_list_transitions().times(0);

    let err = driver(mock)
        .crawl("https://docs.example.com", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Poll(PollError::ExecutionFailed { .. })));
}

#[tokio::test]
async fn test_crawl_without_transitions() {
    let mut mock = MockPlatform::new();
    mock.expect_create_execution()
        .returning(|_, _| Ok(Execution::new("e1", ExecutionStatus::Queued)));
    mock.expect_get_execution()
        .returning(|id| Ok(Execution::new(id, ExecutionStatus::Succeeded)));
    mock.expect_list_transitions().returning(|_| Ok(Vec::new()));

    let err = driver(mock)
        .crawl("https://docs.example.com", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::NoTransitions(id) if id == "e1"));
}

#[tokio::test]
async fn test_deploy_then_save() {
    let defs_dir = TempDir::new().unwrap();
    write_definitions(defs_dir.path());
    let definitions = Definitions::crawl(defs_dir.path()).await.unwrap();
    assert_eq!(definitions.task.name, "Crawl docs");

    let mut mock = MockPlatform::new();
    mock.expect_create_or_update_agent()
        .times(1)
        .withf(|agent_id, def| agent_id == "agent-1" && def.name == "Docs Assistant")
        .returning(|id, def| {
            Ok(Agent {
                id: id.to_string(),
                name: def.name.clone(),
                about: def.about.clone(),
                model: def.model.clone(),
                instructions: def.instructions.clone(),
            })
        });
    mock.expect_create_or_update_task()
        .times(1)
        .withf(|agent_id, task_id, def| {
            agent_id == "agent-1" && task_id == "crawl-task" && def.body.contains_key("main")
        })
        .returning(|_, task_id, _| {
            Ok(Task {
                id: task_id.to_string(),
                name: None,
            })
        });

    let deployment = ensure_deployed(&mock, "agent-1", "crawl-task", &definitions)
        .await
        .unwrap();
    assert_eq!(deployment.agent_id, "agent-1");
    assert_eq!(deployment.task_id, "crawl-task");

    let out_dir = TempDir::new().unwrap();
    let path = save_output(&json!({"pages": 1}), &out_dir.path().join("output"))
        .await
        .unwrap();
    assert!(path.ends_with(CRAWL_OUTPUT_FILE));
    let saved: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(saved["pages"], 1);
}
