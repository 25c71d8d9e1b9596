//! tabsplit CLI — the main entry point.
//!
//! Commands:
//! - `serve` — Start the HTTP gateway
//! - `split` — Parse a receipt photo and split it from the terminal

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "tabsplit",
    about = "tabsplit — AI-assisted restaurant bill splitting",
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
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Split a receipt from the terminal
    Split {
        /// Path to the receipt photo
        #[arg(short, long)]
        image: std::path::PathBuf,

        /// Apply these instructions and exit instead of going interactive
        /// (repeatable)
        #[arg(short, long)]
        command: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Split { image, command } => commands::split::run(image, command).await?,
    }

    Ok(())
}
