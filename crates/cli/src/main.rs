//! Waymark CLI: the main entry point.
//!
//! Commands:
//! - `run`       Filter, rank and pack one retrieval result
//! - `validate`  Check a constraint spec without running anything
//! - `batch`     Run a directory of requests concurrently
//! - `config`    Show, locate or validate the configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use waymark_config::{AppConfig, LoggingConfig};

mod commands;

#[derive(Parser)]
#[command(
    name = "waymark",
    about = "Waymark: constraint-aware evidence pipeline",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline on one retrieval result and print the generator input
    Run {
        /// Retrieval result (JSON)
        #[arg(short, long)]
        retrieval: PathBuf,

        /// Constraint spec (JSON, or TOML by extension)
        #[arg(short, long)]
        spec: PathBuf,

        /// Override the spec's max_tokens
        #[arg(short, long)]
        budget: Option<usize>,

        /// Print the full outcome (elimination report, ranking, skipped chunks)
        #[arg(long)]
        report: bool,

        /// Pretty-print JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a constraint spec
    Validate {
        /// Constraint spec (JSON, or TOML by extension)
        #[arg(short, long)]
        spec: PathBuf,
    },

    /// Run every request file in a directory, concurrently
    Batch {
        /// Directory of `*.json` request files, each `{"retrieval": ..., "spec": ...}`
        dir: PathBuf,

        /// Maximum requests in flight
        #[arg(short, long, default_value_t = 4)]
        concurrency: usize,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file path
    Path,
    /// Validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loaded = AppConfig::load();
    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_tracing(cli.verbose, &logging);

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(loaded?).await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate(loaded).await?,
        },
        Commands::Run {
            retrieval,
            spec,
            budget,
            report,
            pretty,
        } => {
            let config = loaded?;
            let opts = commands::run::RunOptions {
                retrieval,
                spec,
                budget,
                report,
                pretty,
            };
            commands::run::run(&config, opts).await?
        }
        Commands::Validate { spec } => commands::validate::run(&loaded?, &spec).await?,
        Commands::Batch { dir, concurrency } => {
            commands::batch::run(loaded?, &dir, concurrency).await?
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: bool, logging: &LoggingConfig) {
    let filter = if verbose { "debug" } else { logging.level.as_str() };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
