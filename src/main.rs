mod cli;
mod config;
mod db;
mod embedding;
mod memory;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mnema", version, about = "Markdown knowledge-base sync and hybrid retrieval for AI agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync workspace documents into the chunk store
    Sync {
        /// Sync a single workspace-relative file at high importance
        #[arg(long, conflicts_with = "daily")]
        file: Option<String>,
        /// Sync all daily notes (no recency cap)
        #[arg(long)]
        daily: bool,
    },
    /// Hybrid semantic + keyword search over stored chunks
    Recall {
        /// Query text
        #[arg(required = true)]
        query: Vec<String>,
        /// Maximum results to return
        #[arg(long)]
        limit: Option<usize>,
        /// Emit JSON instead of formatted output
        #[arg(long)]
        json: bool,
    },
    /// Assemble the agent startup context bundle
    Boot {
        #[arg(long)]
        json: bool,
    },
    /// List daily-note chunks from the last N days
    Recent {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::MnemaConfig::load()?;

    // Log to stderr so stdout stays clean for piped/JSON output.
    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Sync { file, daily } => {
            cli::run_sync(&config, file.as_deref(), daily).await?;
        }
        Command::Recall { query, limit, json } => {
            cli::run_recall(&config, &query.join(" "), limit, json).await?;
        }
        Command::Boot { json } => {
            cli::run_boot(&config, json)?;
        }
        Command::Recent { days } => {
            cli::run_recent(&config, days)?;
        }
    }

    Ok(())
}
