//! Agent and task definitions kept as YAML on disk

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use assistant_platform::{AgentDefinition, Platform, TaskDefinition};

use crate::{JobError, Result};

pub const AGENT_FILE: &str = "agent.yaml";
pub const CRAWL_TASK_FILE: &str = "task/crawl.yaml";
pub const INDEX_TASK_FILE: &str = "task/main.yaml";

async fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(JobError::MissingDefinition(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    serde_yaml::from_str(&text).map_err(|source| JobError::InvalidDefinition {
        path: path.to_path_buf(),
        source,
    })
}

pub async fn load_agent_definition(path: &Path) -> Result<AgentDefinition> {
    load_yaml(path).await
}

pub async fn load_task_definition(path: &Path) -> Result<TaskDefinition> {
    load_yaml(path).await
}

/// The agent plus the one task a job needs
#[derive(Debug, Clone)]
pub struct Definitions {
    pub agent: AgentDefinition,
    pub task: TaskDefinition,
}

impl Definitions {
    /// Load `agent.yaml` and the given task file from `dir`
    pub async fn load(dir: &Path, task_file: &str) -> Result<Self> {
        let agent_path = dir.join(AGENT_FILE);
        let task_path: PathBuf = dir.join(task_file);
        debug!(
            "Loading definitions from {} and {}",
            agent_path.display(),
            task_path.display()
        );

        Ok(Self {
            agent: load_agent_definition(&agent_path).await?,
            task: load_task_definition(&task_path).await?,
        })
    }

    pub async fn crawl(dir: &Path) -> Result<Self> {
        Self::load(dir, CRAWL_TASK_FILE).await
    }

    pub async fn index(dir: &Path) -> Result<Self> {
        Self::load(dir, INDEX_TASK_FILE).await
    }
}

/// Identifiers the platform reported back after deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub agent_id: String,
    pub task_id: String,
}

/// Create or update the agent, then its task, under fixed identifiers
pub async fn ensure_deployed(
    platform: &dyn Platform,
    agent_id: &str,
    task_id: &str,
    definitions: &Definitions,
) -> Result<Deployment> {
    let agent = platform
        .create_or_update_agent(agent_id, &definitions.agent)
        .await?;
    info!("Agent ID: {}", agent.id);

    let task = platform
        .create_or_update_task(&agent.id, task_id, &definitions.task)
        .await?;
    info!("Task ID: {}", task.id);

    Ok(Deployment {
        agent_id: agent.id,
        task_id: task.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assistant_platform::Instructions;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_load_agent_definition() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            AGENT_FILE,
            "name: Docs Assistant\nabout: Answers questions\nmodel: claude-sonnet-4\ninstructions:\n  - Be precise.\n  - Cite sources.\n",
        );

        let agent = load_agent_definition(&dir.path().join(AGENT_FILE))
            .await
            .unwrap();
        assert_eq!(agent.name, "Docs Assistant");
        assert_eq!(agent.model.as_deref(), Some("claude-sonnet-4"));
        assert_eq!(
            agent.instructions,
            Some(Instructions::Many(vec![
                "Be precise.".to_string(),
                "Cite sources.".to_string()
            ]))
        );
    }

    #[tokio::test]
    async fn test_load_task_keeps_body() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            CRAWL_TASK_FILE,
            "name: crawl\ninput_schema:\n  type: object\nmain:\n  - tool: spider_crawler\n",
        );

        let task = load_task_definition(&dir.path().join(CRAWL_TASK_FILE))
            .await
            .unwrap();
        assert_eq!(task.name, "crawl");
        assert_eq!(task.body["input_schema"]["type"], "object");
        assert_eq!(task.body["main"][0]["tool"], "spider_crawler");
    }

    #[tokio::test]
    async fn test_missing_definition() {
        let dir = TempDir::new().unwrap();
        let err = Definitions::index(dir.path()).await.unwrap_err();
        assert!(matches!(err, JobError::MissingDefinition(path) if path.ends_with(AGENT_FILE)));
    }

    #[tokio::test]
    async fn test_invalid_definition() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), AGENT_FILE, "about: no name here\n");

        let err = load_agent_definition(&dir.path().join(AGENT_FILE))
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidDefinition { .. }));
    }
}
