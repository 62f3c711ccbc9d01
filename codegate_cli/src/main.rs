//! Codegate CLI - Lab traffic driver for the verification guard
//!
//! Usage:
//!   codegate check <CODE>       Submit a single code
//!   codegate probe              Sweep candidate codes against the guard

mod probe;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "codegate")]
#[command(author = "Codegate Team")]
#[command(version)]
#[command(about = "Lab traffic driver for the Codegate verification guard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server base URL
    #[arg(
        short,
        long,
        global = true,
        env = "CODEGATE_TARGET",
        default_value = "http://127.0.0.1:8080"
    )]
    target: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a single code
    Check {
        /// Code to submit
        code: String,
    },

    /// Sweep candidate codes against the guard
    Probe {
        /// First candidate code
        #[arg(long, default_value_t = codegate_common::constants::CODE_MIN)]
        start: u32,

        /// How many codes to try
        #[arg(long, default_value_t = 5000)]
        count: u32,

        /// Concurrent workers
        #[arg(short, long, default_value_t = 20)]
        concurrency: usize,

        /// Base delay between attempts per worker (milliseconds)
        #[arg(long, default_value_t = 500)]
        delay_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let crate_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("warn,codegate_cli={}", crate_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    match cli.command {
        Commands::Check { code } => {
            probe::check(&cli.target, &code).await?;
        }

        Commands::Probe {
            start,
            count,
            concurrency,
            delay_ms,
        } => {
            let opts = probe::ProbeOptions {
                target: cli.target,
                start,
                count,
                concurrency,
                delay_ms,
            };
            probe::run(opts).await?;
        }
    }

    Ok(())
}
