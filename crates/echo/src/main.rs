// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Echo - turn a text message archive into a searchable index and a fact timeline.
//!
//! This is the binary entry point. Each subcommand wires the adapters it
//! needs from configuration and runs one pipeline stage.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod doctor;
mod facts;
mod import;
mod index;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use echo_config::EchoConfig;
use echo_core::EchoError;
use tracing::error;

/// Echo - message archive to semantic index and fact timeline.
#[derive(Parser, Debug)]
#[command(name = "echo", version, about, long_about = None)]
struct Cli {
    /// Configuration file to use instead of the standard search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Import one contact's messages from an sms.db export.
    Import {
        /// Path to the exported sms.db.
        #[arg(long)]
        source: PathBuf,
        /// Phone number of the contact.
        #[arg(long)]
        phone: String,
        /// Target database (defaults to storage.database_path).
        #[arg(long)]
        target: Option<PathBuf>,
        /// Gap in minutes that starts a new conversation.
        #[arg(long)]
        gap_minutes: Option<u64>,
        /// Keep the existing database file; refused if it already holds messages.
        #[arg(long)]
        keep_existing: bool,
    },
    /// Embed every stored message into the vector collection.
    Index {
        /// Drop and recreate the collection first.
        #[arg(long)]
        recreate: bool,
    },
    /// Extract facts from every stored conversation.
    Facts {
        /// Only process these conversation ids.
        #[arg(long = "conversation")]
        conversations: Vec<String>,
    },
    /// Synthesize monthly timelines and the master timeline.
    Timeline {
        /// Only synthesize this month (YYYY-MM).
        #[arg(long)]
        month: Option<String>,
        /// Skip synthesis and only render the master timeline.
        #[arg(long)]
        master_only: bool,
    },
    /// Hybrid search over indexed messages.
    Search {
        /// Query text.
        query: String,
        /// Number of results (defaults to index.search_limit).
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Check configuration, storage, and external services.
    Doctor,
}

fn load_config(path: Option<&PathBuf>) -> EchoConfig {
    let loaded = match path {
        Some(path) => echo_config::load_and_validate_path(path),
        None => echo_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            echo_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());
    init_tracing(&config.logging.level);

    let result: Result<(), EchoError> = match cli.command {
        Commands::Import {
            source,
            phone,
            target,
            gap_minutes,
            keep_existing,
        } => {
            import::run_import(
                &config,
                import::ImportArgs {
                    source,
                    phone,
                    target,
                    gap_minutes,
                    keep_existing,
                },
            )
            .await
        }
        Commands::Index { recreate } => index::run_index(&config, recreate).await,
        Commands::Facts { conversations } => facts::run_facts(&config, conversations).await,
        Commands::Timeline { month, master_only } => {
            facts::run_timeline(&config, month.as_deref(), master_only).await
        }
        Commands::Search { query, limit } => index::run_search(&config, &query, limit).await,
        Commands::Doctor => doctor::run_doctor(&config).await,
    };

    if let Err(e) = result {
        error!(error = %e, "command failed");
        eprintln!("echo: {e}");
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("echo={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
