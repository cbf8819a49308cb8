#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use charrelay::config::Config;
use charrelay::{characters, gateway};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Character chat relay over an OpenAI-compatible API.
#[derive(Parser, Debug)]
#[command(name = "charrelay")]
#[command(version)]
#[command(about = "Relay chat messages to an LLM with per-session character transcripts.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the relay gateway
    #[command(long_about = "\
Start the relay gateway.

Binds the HTTP server and relays POST /chat requests to the configured \
upstream API. Host and port default to the config file values.

Examples:
  charrelay serve
  charrelay serve --port 8080
  charrelay serve --host 0.0.0.0")]
    Serve {
        /// Host to bind to; defaults to config gateway.host
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on; defaults to config gateway.port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List the configured characters
    Characters,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Respects RUST_LOG, defaults to INFO.
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = Config::load()?;

    match Cli::parse().command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            info!("starting charrelay gateway on {host}:{port}");
            gateway::run_gateway(&host, port, &config).await
        }

        Commands::Characters => {
            let book = match config.characters {
                Some(table) => characters::CharacterBook::from_table(table),
                None => characters::CharacterBook::builtin(),
            };
            println!("Configured characters ({} total):\n", book.len());
            for name in book.names() {
                let prompt = book.system_prompt(name);
                let preview: String = prompt.chars().take(60).collect();
                let ellipsis = if prompt.chars().count() > 60 { "…" } else { "" };
                println!("  {:<16} {preview}{ellipsis}", name);
            }
            Ok(())
        }
    }
}
