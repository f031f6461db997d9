//! roster - browse and edit a remote user roster from the terminal.
//!
//! Lists users one page at a time, searches them by name, and creates,
//! updates or deletes them through the users API. Page one is persisted
//! between runs unless `--no-persist` is given.

mod app;
mod cli;

use std::io;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use roster_core::Config;

use app::App;
use cli::{Cli, Commands};

/// Log file prefix inside `ROSTER_LOG_DIR`
const LOG_FILE_PREFIX: &str = "roster.log";

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` controls the level (default `warn`). When `ROSTER_LOG_DIR` is
/// set, logs are also written to a daily rolling file there; the returned
/// guard must stay alive until exit so buffered lines get flushed.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var("ROSTER_LOG_DIR") {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = init_tracing();
    let cli = Cli::parse();
    info!(command = ?cli.command, "roster starting");

    let config = Config::load()?;
    let app = App::new(config, cli.no_persist, cli.json)?;

    match cli.command {
        Commands::List { pages, all } => app.list(pages, all).await,
        Commands::Search { query, exclude } => app.search(&query, &exclude).await,
        Commands::Show { id } => app.show(id).await,
        Commands::Create { fields } => app.create(fields).await,
        Commands::Update { id, fields } => app.update(id, fields).await,
        Commands::Delete { id } => app.delete(id).await,
        Commands::Cache { action } => app.cache(action),
    }
}
