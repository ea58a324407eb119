//! Shared helpers for the binary's integration tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// Isolated home, working directory and definitions for one run
pub struct TestEnv {
    pub temp_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            temp_dir: tempdir()?,
        })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Command with no platform settings inherited from the caller
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_assistant"));
        cmd.current_dir(self.temp_dir.path())
            .env("HOME", self.temp_dir.path())
            .env_remove("JULEP_API_KEY")
            .env_remove("AGENT_UUID")
            .env_remove("JULEP_ENV")
            .env_remove("JULEP_API_BASE")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Command pointed at `api_base` with a key set
    pub fn connected(&self, api_base: &str) -> Command {
        let mut cmd = self.command();
        cmd.env("JULEP_API_KEY", "test-key")
            .env("JULEP_API_BASE", api_base);
        cmd
    }

    /// Write `~/.julep-assistant/config.json`
    pub fn write_config(&self, content: &str) -> anyhow::Result<()> {
        let dir = self.path(".julep-assistant");
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("config.json"), content)?;
        Ok(())
    }

    /// Config with every delay set to zero
    pub fn write_fast_config(&self) -> anyhow::Result<()> {
        self.write_config(
            r#"{
  "jobs": {
    "poll_interval_secs": 0,
    "max_poll_secs": 10,
    "max_attempts": 2,
    "retry_delay_secs": 0,
    "item_delay_secs": 0
  }
}"#,
        )
    }

    pub fn write_file(&self, name: &str, content: &str) -> anyhow::Result<PathBuf> {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Agent and task definitions under `definitions/`
    pub fn write_definitions(&self) -> anyhow::Result<PathBuf> {
        self.write_file(
            "definitions/agent.yaml",
            "name: Docs Assistant\nabout: Answers documentation questions\nmodel: claude-sonnet-4\ninstructions: Be precise.\n",
        )?;
        self.write_file(
            "definitions/task/crawl.yaml",
            "name: Crawl docs\nmain:\n  - tool: spider\n",
        )?;
        self.write_file(
            "definitions/task/main.yaml",
            "name: Index docs\nmain:\n  - prompt: index\n",
        )?;
        Ok(self.path("definitions"))
    }
}

pub fn read_dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
