#![deny(clippy::all)]

mod analysis;
mod capture;
mod chat;
mod concerns;
mod config;
mod error;
mod history;
mod session;
mod ui;

use analysis::GeminiClient;
use anyhow::Context as _;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A local .env file may provide GEMINI_API_KEY
    dotenvy::dotenv().ok();

    // Logs go to a file; the terminal belongs to the UI
    let _log_guard = init_logging()?;

    let config = config::load_config()?;
    let api_key = config::api_key_from_env()?;
    info!(model = %config.gemini.model, "Starting DermaLens");

    let gemini = GeminiClient::new(&config.gemini, api_key)?;

    let saved_history = history::load_history();
    info!("Loaded {} history entries", saved_history.len());

    ui::run(gemini, saved_history).await
}

/// Initialize file-backed structured logging
///
/// The returned guard must stay alive for the process lifetime so
/// buffered log lines are flushed on exit.
fn init_logging() -> anyhow::Result<WorkerGuard> {
    let log_dir = dirs::data_dir()
        .context("Could not determine data directory for logs")?
        .join("Dermalens")
        .join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {log_dir:?}"))?;

    let appender = tracing_appender::rolling::daily(log_dir, "dermalens.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}
