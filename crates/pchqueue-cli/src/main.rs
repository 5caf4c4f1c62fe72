//! PCH task queue CLI tool.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod creator;

#[derive(Parser)]
#[command(name = "pchqueue")]
#[command(about = "Precompiled header task queue", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, env = "PCHQUEUE_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a queue configuration
    Validate {
        /// Path to the configuration file
        #[arg(default_value = "pchqueue.kdl")]
        path: String,
    },
    /// Run a task file through the queue with a dry-run creator
    Run {
        /// Path to the configuration file
        #[arg(long, env = "PCHQUEUE_CONFIG")]
        config: Option<String>,
        /// JSON file with system, project and removed tasks
        #[arg(long)]
        tasks: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match cli.command {
        Commands::Validate { path } => {
            commands::validate(&path)?;
        }
        Commands::Run { config, tasks } => {
            commands::run::run_tasks(config.as_deref(), &tasks).await?;
        }
    }

    Ok(())
}
