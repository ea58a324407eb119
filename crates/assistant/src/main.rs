//! Julep documentation assistant

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    chat_command, crawl_command, index_command, init_command, status_command, JobOptions,
};

/// Documentation assistant: crawl, index and chat
#[derive(Parser)]
#[command(name = "assistant")]
#[command(about = "◆ Julep documentation assistant")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl a documentation site and save the output
    #[command(alias = "crawler")]
    Crawl {
        /// Site to crawl
        url: String,
        #[command(flatten)]
        options: JobArgs,
    },
    /// Index every document from a crawler output file
    #[command(alias = "indexer")]
    Index {
        /// Crawler output file
        file: PathBuf,
        #[command(flatten)]
        options: JobArgs,
    },
    /// Chat with the documentation agent
    Chat,
    /// Show configuration status
    Status,
    /// Write a default config file
    Init,
}

#[derive(clap::Args)]
struct JobArgs {
    /// Directory holding agent.yaml and task/
    #[arg(short, long)]
    definitions: Option<PathBuf>,
    /// Where output files are written
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

impl From<JobArgs> for JobOptions {
    fn from(args: JobArgs) -> Self {
        JobOptions {
            definitions: args.definitions,
            output_dir: args.output_dir,
        }
    }
}

fn init_tracing(verbose: bool, default_level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Commands::Chat => "warn",
        _ => "info",
    };
    init_tracing(cli.verbose, default_level);

    let result = match cli.command {
        Commands::Crawl { url, options } => crawl_command(url, options.into()).await,
        Commands::Index { file, options } => index_command(file, options.into()).await,
        Commands::Chat => chat_command().await,
        Commands::Status => status_command().await,
        Commands::Init => init_command().await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }

    // the stdin reader of a chat would otherwise hold the runtime open
    std::process::exit(0);
}
