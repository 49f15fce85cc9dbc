// Demo driver and configuration tooling for the membership service

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands {
    pub mod config;
    pub mod demo;
}

#[derive(Parser)]
#[command(name = "bnms")]
#[command(about = "Business network membership service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the onboarding story over an in-process network
    Demo {
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of participants
        #[arg(short = 'n', long, default_value = "3")]
        members: usize,
    },

    /// Print the effective configuration
    Config {
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Demo { config, members } => {
            commands::demo::run(config.as_deref(), members).await?;
        }
        Commands::Config { config } => {
            commands::config::show(config.as_deref())?;
        }
    }

    Ok(())
}
