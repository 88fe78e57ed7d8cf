//! # Docs Assistant CLI (`docs-assistant`)
//!
//! ## Usage
//!
//! ```bash
//! docs-assistant --config ./config/assistant.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docs-assistant serve` | Start the chat web app |
//! | `docs-assistant ingest` | Embed the Markdown docs into the vector store |
//!
//! API keys are read from the environment (`OPENAI_API_KEY`,
//! `COMET_API_KEY`). A `.env` file in the working directory is loaded first
//! when present. Set `RUST_LOG` to adjust log verbosity.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docs_assistant::{config, ingest, server};

/// Docs Assistant — a keyword-grounded chat assistant for product
/// documentation.
#[derive(Parser)]
#[command(name = "docs-assistant", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/assistant.toml`; when that default file does not
    /// exist the built-in defaults are used.
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the chat web app.
    ///
    /// Loads the JSON knowledge base, then serves the chat page and API on
    /// the address configured in `[server].bind`.
    Serve,

    /// Ingest Markdown documentation into the vector store.
    ///
    /// Splits every Markdown file under `[ingest].docs_dir` at level 1-3
    /// headings, embeds each section, and appends it to
    /// `[ingest].store_path`.
    Ingest,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: failed to load .env: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docs_assistant=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ingest => {
            let report = ingest::run_ingest(&cfg).await?;
            println!("ingest {}", cfg.ingest.docs_dir.display());
            println!("  files: {}", report.files);
            println!("  chunks written: {}", report.chunks);
            println!("  store total: {}", report.store_total);
            println!("ok");
        }
    }

    Ok(())
}
