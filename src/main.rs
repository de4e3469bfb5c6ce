//! # docdrop CLI
//!
//! ```bash
//! docdrop --config ./config/docdrop.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docdrop serve` | Run the upload service |
//! | `docdrop init` | Open the configured document store and check it answers |
//! | `docdrop ask [QUESTION]` | Ask a question (interactive when no question is given) |
//!
//! ## Examples
//!
//! ```bash
//! # Serve uploads into MongoDB on port 8080
//! MONGODB_URI=mongodb://localhost:27017 PORT=8080 docdrop serve
//!
//! # Prepare a local SQLite store
//! MONGODB_URI=sqlite:./data/docdrop.sqlite docdrop init
//!
//! # Ask against a remote service
//! ASK_API_URL=https://ask.example.com docdrop ask "pricing"
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docdrop::config;
use docdrop::store::{self, ConnectOptions};

/// docdrop: upload metadata service and question client.
///
/// Settings come from an optional TOML file, overridden by `PORT`,
/// `MONGODB_URI`, `DOCDROP_HOSTING` and `ASK_API_URL`.
#[derive(Parser)]
#[command(name = "docdrop", version, about)]
struct Cli {
    /// Path to configuration file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "./config/docdrop.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the upload service.
    ///
    /// Serves `GET /`, `GET /health`, `POST /upload` and `POST /api/upload`
    /// on `PORT` (default 3000).
    Serve,

    /// Open the configured document store and check that it answers.
    ///
    /// For `sqlite:` stores this creates the database file and schema.
    /// Idempotent.
    Init,

    /// Ask a question.
    ///
    /// Posts to `ASK_API_URL` when set, otherwise answers with a local
    /// placeholder. Without QUESTION, reads one question per line from stdin.
    Ask {
        /// The question to ask.
        question: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docdrop=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            docdrop::server::run_server(&cfg).await?;
        }
        Commands::Init => {
            let store = store::open(&ConnectOptions::from_config(&cfg.store)?).await?;
            let backend = store.backend();
            store.close().await;
            println!(
                "Document store ready (backend: {}, collection: {}).",
                backend, cfg.store.collection
            );
        }
        Commands::Ask { question } => {
            docdrop::prompt::run_ask(&cfg, question).await?;
        }
    }

    Ok(())
}
