mod commands;
mod config;
mod logging;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sluice",
    version,
    about = "Drain a message queue into a function, deleting only what succeeded"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the in-memory queue and run dispatch cycles against it
    Run {
        /// Path to the TOML config file
        config: PathBuf,
        /// Number of cycles to run
        #[arg(long, default_value_t = 1)]
        cycles: u32,
        /// Pause between cycles, in milliseconds
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
    },
    /// Validate the config file and print the resolved target
    Check {
        /// Path to the TOML config file
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run {
            config,
            cycles,
            interval_ms,
        } => commands::run::execute(&config, cycles, Duration::from_millis(interval_ms)).await,
        Commands::Check { config } => commands::check::execute(&config),
    }
}
