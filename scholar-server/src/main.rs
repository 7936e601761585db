//! Scholar CLI - HTTP front door and one-shot queries

mod routes;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use scholar_core::composer::ResearchAssistant;
use scholar_core::config::ScholarConfig;

#[derive(Parser)]
#[command(name = "scholar")]
#[command(about = "Research assistant over arXiv papers and the web", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(short, long, env = "SCHOLAR_BIND")]
        bind: Option<String>,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Answer a single query and print the JSON response
    Ask {
        /// The research question
        query: String,

        /// Conversation session to use
        #[arg(short, long)]
        session: Option<String>,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Version information
    Version,
}

fn load_config(path: Option<&Path>) -> Result<ScholarConfig> {
    let config = match path {
        Some(path) => ScholarConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ScholarConfig::load().context("loading configuration")?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("scholar {}", env!("CARGO_PKG_VERSION"));
            println!("scholar-core {}", scholar_core::VERSION);
        }
        Commands::Serve { bind, config } => {
            let config = load_config(config.as_deref())?;
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let assistant = ResearchAssistant::from_config(&config)?;

            let app = routes::router(routes::AppState {
                assistant: Arc::new(assistant),
            });

            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("binding {}", bind))?;
            tracing::info!(bind = %bind, "Scholar listening");
            axum::serve(listener, app).await?;
        }
        Commands::Ask {
            query,
            session,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let assistant = ResearchAssistant::from_config(&config)?;

            let outcome = assistant.ask(&query, session.as_deref()).await?;
            if !outcome.is_success() {
                tracing::warn!(status = ?outcome.status(), "Query did not fully succeed");
            }
            println!("{}", serde_json::to_string_pretty(&outcome.into_response())?);
        }
    }

    Ok(())
}
