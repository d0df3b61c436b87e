//! CLI application for structured receipt extraction.

mod commands;

use clap::{Parser, Subcommand};
use tracing::{Level, debug, warn};
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, process};

/// Receipt extraction - answer questions about receipt images with a vision model
#[derive(Parser)]
#[command(name = "rcpt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every image in a directory (default)
    Batch(batch::BatchArgs),

    /// Extract a single image
    Process(process::ProcessArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Credentials may live in a .env file next to the inputs
    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring .env file: {}", e),
    }

    match cli.command {
        Some(Commands::Batch(args)) => batch::run(args, cli.config.as_deref()).await,
        Some(Commands::Process(args)) => process::run(args, cli.config.as_deref()).await,
        Some(Commands::Config(args)) => config::run(args, cli.config.as_deref()).await,
        None => batch::run(batch::BatchArgs::default(), cli.config.as_deref()).await,
    }
}
