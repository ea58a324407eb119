//! Command implementations

use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{debug, info, warn};

use assistant_bus::{BusUi, MessageBus, OutboundDispatcher};
use assistant_chat::{read_input, AppContext, ChatApp, TerminalRenderer};
use assistant_config::{self, Config};
use assistant_executions::{CancellationToken, ExecutionPoller, PollConfig, RetryPolicy, TaskRunner};
use assistant_jobs::crawl::save_output;
use assistant_jobs::{
    ensure_deployed, load_crawler_output, CrawlDriver, Definitions, IndexSummary, Indexer,
};
use assistant_platform::{HttpPlatform, Platform};

/// Directory overrides shared by the batch jobs
#[derive(Debug, Default)]
pub struct JobOptions {
    pub definitions: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl JobOptions {
    fn definitions_dir(&self, config: &Config) -> PathBuf {
        self.definitions
            .clone()
            .unwrap_or_else(|| config.jobs.definitions_dir())
    }

    fn output_dir(&self, config: &Config) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| config.jobs.output_dir())
    }
}

/// Platform client for a config that has an API key
fn connect(config: &Config) -> Result<Arc<dyn Platform>> {
    let api_key = config.require_api_key()?;
    let api_base = config.api_base()?;
    debug!("Using platform at {}", api_base);
    Ok(Arc::new(HttpPlatform::new(api_key, api_base)))
}

fn poller(platform: Arc<dyn Platform>, config: &Config) -> ExecutionPoller {
    ExecutionPoller::new(
        platform,
        PollConfig {
            interval: config.jobs.poll_interval(),
            max_wait: config.jobs.max_poll(),
        },
    )
}

/// Token cancelled on Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping...");
            child.cancel();
        }
    });
    token
}

/// Deploy the crawl task, run it once and save its output
pub async fn crawl_command(url: String, options: JobOptions) -> Result<()> {
    let config = Config::load().await?;
    let platform = connect(&config)?;

    let definitions_dir = options.definitions_dir(&config);
    let definitions = Definitions::crawl(&definitions_dir)
        .await
        .context("Failed to load crawl definitions")?;

    println!("Creating/updating agent and task...");
    let deployment = ensure_deployed(
        platform.as_ref(),
        config.agent_id(),
        &config.jobs.crawl_task_id,
        &definitions,
    )
    .await
    .context("Failed to deploy crawl task")?;

    let cancel = cancel_on_ctrl_c();
    let driver = CrawlDriver::new(
        platform.clone(),
        poller(platform, &config),
        deployment.task_id,
    );

    println!("Crawling {}...", url);
    let outcome = driver
        .crawl(&url, &cancel)
        .await
        .with_context(|| format!("Crawl of {url} failed"))?;
    info!("Crawl execution {} succeeded", outcome.execution_id);

    let path = save_output(&outcome.output, &options.output_dir(&config)).await?;
    println!("✓ Crawler output saved to {}", path.display());
    Ok(())
}

/// Index every document of a crawler output file and write a summary
pub async fn index_command(file: PathBuf, options: JobOptions) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File '{}' not found", file.display());
    }

    let config = Config::load().await?;
    let platform = connect(&config)?;

    let normalized = load_crawler_output(&file).await?;
    if normalized.is_empty() {
        anyhow::bail!("No documents found in the crawler output");
    }
    println!("Found {} documents to index", normalized.documents.len());

    let definitions_dir = options.definitions_dir(&config);
    let definitions = Definitions::index(&definitions_dir)
        .await
        .context("Failed to load indexing definitions")?;

    println!("Creating/updating agent and task...");
    let deployment = ensure_deployed(
        platform.as_ref(),
        config.agent_id(),
        &config.jobs.index_task_id,
        &definitions,
    )
    .await
    .context("Failed to deploy indexing task")?;

    let runner = TaskRunner::new(
        platform.clone(),
        poller(platform, &config),
        deployment.task_id.clone(),
        RetryPolicy::new(config.jobs.max_attempts, config.jobs.retry_delay()),
    );
    let indexer = Indexer::new(runner, config.jobs.item_delay());

    let cancel = cancel_on_ctrl_c();
    let results = indexer.process_all(&normalized.documents, &cancel).await;

    let summary = IndexSummary::new(
        Some(deployment.agent_id),
        Some(deployment.task_id),
        results,
    );
    let path = summary
        .save(&options.output_dir(&config))
        .await
        .context("Failed to write summary")?;

    println!();
    print!("{}", summary.console());
    println!("\nSummary saved to: {}", path.display());
    Ok(())
}

/// Interactive chat on stdin and stdout
pub async fn chat_command() -> Result<()> {
    let config = Config::load().await?;
    let platform = connect(&config)?;

    let ctx = AppContext::new(platform, config.agent_id(), config.chat.clone());
    let app = ChatApp::new(Arc::new(ctx));

    let (bus, inbound_rx, outbound_rx) = MessageBus::channels();
    let ui = BusUi::new(bus.outbound_sender(), inbound_rx);

    println!("{}", TerminalRenderer::help());

    let mut renderer = TerminalRenderer::new();
    let dispatcher = tokio::spawn(OutboundDispatcher::new(outbound_rx).run(move |frame| {
        let mut stdout = std::io::stdout();
        if let Err(e) = renderer.render(&frame, &mut stdout) {
            warn!("Failed to write to terminal: {}", e);
        }
    }));

    tokio::spawn(read_input(
        BufReader::new(tokio::io::stdin()),
        bus.inbound_sender(),
    ));

    let result = app.run(&ui).await;

    drop(ui);
    drop(bus);
    dispatcher.await.context("UI dispatcher panicked")?;
    result.context("Chat ended unexpectedly")?;

    println!("\nBye!");
    Ok(())
}

/// Write a config file with every default filled in
pub async fn init_command() -> Result<()> {
    let path = assistant_config::config_path();
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }

    Config::default()
        .save_to(&path)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Created {}", path.display());

    println!("✓ Config written to {}", path.display());
    println!("\nNext steps:");
    println!("  1. Set JULEP_API_KEY in your environment or a .env file");
    println!("  2. Crawl the docs: assistant crawl https://docs.julep.ai");
    Ok(())
}

fn mark(ok: bool, yes: &str, no: &str) -> String {
    if ok {
        format!("[{yes}]")
    } else {
        format!("[{no}]")
    }
}

/// Show where settings come from and whether the jobs can run
pub async fn status_command() -> Result<()> {
    let config_path = assistant_config::config_path();
    let config = Config::load().await?;
    let options = JobOptions::default();
    let definitions_dir = options.definitions_dir(&config);
    let output_dir = options.output_dir(&config);

    println!("◆ Assistant Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "Config:      {} {}",
        config_path.display(),
        mark(config_path.exists(), "OK", "Defaults")
    );
    println!("API Key:     {}", mark(config.has_api_key(), "Set", "Missing"));
    println!("API Base:    {}", config.api_base()?);
    println!("Agent:       {}", config.agent_id());
    println!("Crawl task:  {}", config.jobs.crawl_task_id);
    println!("Index task:  {}", config.jobs.index_task_id);
    println!(
        "Definitions: {} {}",
        definitions_dir.display(),
        mark(definitions_dir.exists(), "OK", "Missing")
    );
    println!(
        "Output:      {} {}",
        output_dir.display(),
        mark(output_dir.exists(), "OK", "Not created yet")
    );
    println!("Chat model:  {}", config.chat.model);

    std::io::stdout().flush()?;
    Ok(())
}
