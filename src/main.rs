use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use chatrelay::config::{RelayConfig, ServeArgs};
use chatrelay::{chat, web_server};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the relay web server.
    Serve(ServeArgs),
    /// Chat with a running relay from the terminal.
    Chat {
        #[arg(long, default_value = "http://localhost:3000", help = "Base URL of the relay.")]
        url: String,
        #[arg(long, default_value_t = 30, help = "Milliseconds between revealed characters.")]
        tick_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for GEMINI_API_KEY, PORT, ...)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG (e.g. RUST_LOG=info,chatrelay=debug), info by default
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            // Must fail before anything is bound.
            let config = RelayConfig::try_from(args).context("Invalid relay configuration")?;
            info!("Starting relay on port {}...", config.port);
            web_server::start_web_server(config).await?;
            info!("Shutdown complete.");
        }
        Commands::Chat { url, tick_ms } => {
            chat::run_chat(&url, Duration::from_millis(tick_ms))
                .await
                .context("Chat session failed")?;
        }
    }

    Ok(())
}
