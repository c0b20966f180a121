//! MathTutor CLI — the main entry point.
//!
//! Commands:
//! - `onboard` — Write a default config file
//! - `chat`    — Interactive tutoring session
//! - `key`     — Save the API key
//! - `stats`   — Show per-topic practice statistics

use clap::{Parser, Subcommand};
use mathtutor_core::{Grade, Mode};

mod commands;

#[derive(Parser)]
#[command(
    name = "mathtutor",
    about = "MathTutor — adaptive middle-school math tutor",
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
    /// Initialize configuration
    Onboard,

    /// Start an interactive tutoring session
    Chat {
        /// Grade to start with (6-9)
        #[arg(short, long)]
        grade: Option<Grade>,

        /// Mode to start in (chat or practice); requires --grade
        #[arg(short, long, requires = "grade")]
        mode: Option<Mode>,
    },

    /// Save the API key used to reach the model
    Key {
        /// The API key
        key: String,
    },

    /// Show topic statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat { grade, mode } => commands::chat::run(grade, mode).await?,
        Commands::Key { key } => commands::key::run(&key).await?,
        Commands::Stats => commands::stats::run().await?,
    }

    Ok(())
}
