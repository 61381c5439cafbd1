//! fibreflow-server binary.
//!
//! Reads `fibreflow.toml` (or the path given with `--config`) and the
//! environment, opens the SQLite store, and serves the JSON API over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use fibreflow_server::{Database, ServerConfig};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "FibreFlow API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "fibreflow.toml")]
  config: PathBuf,
}

/// `RUST_LOG` when set, otherwise the configured level (default `info`).
fn env_filter(log_level: Option<&str>) -> EnvFilter {
  if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
    return EnvFilter::from_default_env();
  }
  EnvFilter::builder().parse_lossy(log_level.unwrap_or("info"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  let env = std::env::vars().collect();
  let config = ServerConfig::load(&cli.config, &env)?;

  tracing_subscriber::fmt()
    .with_env_filter(env_filter(config.log_level.as_deref()))
    .init();

  let database = Database::from_url(&config.database_url)?;
  tracing::info!(?database, "opening store");
  let store = database.open().await?;

  let app = fibreflow_server::app(Arc::new(store), &config)?;
  let address = config.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
