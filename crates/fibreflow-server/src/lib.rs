//! Server assembly for FibreFlow: configuration, store location and the
//! top-level router (`/health` plus the JSON API).

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context as _, bail};
use axum::{Router, routing::get};
use fibreflow_api::{AppState, DEFAULT_QUERY_LIMIT, Notifier, response::Success};
use fibreflow_core::store::FibreStore;
use fibreflow_store_sqlite::SqliteStore;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

/// Prefix for configuration environment variables (`FIBREFLOW_PORT`, ...).
pub const ENV_PREFIX: &str = "FIBREFLOW";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `fibreflow.toml` and the
/// environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  pub database_url:     String,
  /// Maximum rows any list endpoint returns.
  pub query_limit:      usize,
  pub log_level:        Option<String>,
  /// Allowed CORS origins; empty allows any origin.
  pub cors_origins:     Vec<String>,
  pub sendgrid_api_key: Option<String>,
  pub notify_from:      Option<String>,
  pub notify_to:        Vec<String>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:             "0.0.0.0".to_owned(),
      port:             3000,
      database_url:     "sqlite://fibreflow.db".to_owned(),
      query_limit:      DEFAULT_QUERY_LIMIT,
      log_level:        None,
      cors_origins:     Vec::new(),
      sendgrid_api_key: None,
      notify_from:      None,
      notify_to:        Vec::new(),
    }
  }
}

impl ServerConfig {
  /// Layer the optional TOML file at `path`, `FIBREFLOW_*` variables from
  /// `env`, and finally the legacy variable names.
  pub fn load(path: &Path, env: &HashMap<String, String>) -> anyhow::Result<Self> {
    let legacy = |key: &str| env.get(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

    let query_limit = legacy("NEON_POOL_QUERY_LIMIT")
      .map(|v| v.parse::<i64>())
      .transpose()
      .context("NEON_POOL_QUERY_LIMIT is not a number")?;

    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix(ENV_PREFIX)
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("cors_origins")
          .with_list_parse_key("notify_to")
          .source(Some(env.clone())),
      )
      .set_override_option("database_url", legacy("NEON_DATABASE_URL"))?
      .set_override_option("database_url", legacy("DATABASE_URL"))?
      .set_override_option("query_limit", query_limit)?
      .set_override_option("log_level", legacy("LOG_LEVEL"))?
      .set_override_option("sendgrid_api_key", legacy("SENDGRID_API_KEY"))?
      .build()
      .with_context(|| format!("failed to read configuration from {}", path.display()))?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn notifier(&self) -> Notifier {
    Notifier::from_settings(
      self.sendgrid_api_key.as_deref(),
      self.notify_from.as_deref(),
      &self.notify_to,
    )
  }
}

// ─── Database location ───────────────────────────────────────────────────────

/// Where the SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Database {
  Memory,
  File(PathBuf),
}

impl Database {
  /// Accepts `sqlite://<path>`, `sqlite:<path>`, `file:<path>`, a bare path
  /// or `:memory:`. Any other URL scheme is an error.
  pub fn from_url(url: &str) -> anyhow::Result<Self> {
    let url = url.trim();
    let path = match ["sqlite://", "sqlite:", "file:"]
      .iter()
      .find_map(|prefix| url.strip_prefix(prefix))
    {
      Some(rest) => rest,
      None => {
        if let Some((scheme, _)) = url.split_once("://") {
          bail!("unsupported database URL scheme {scheme:?}: only SQLite databases are supported");
        }
        url
      }
    };
    // Connection options such as `?mode=rwc` are not used.
    let path = path.split('?').next().unwrap_or_default();

    match path {
      "" => bail!("database_url does not name a database"),
      ":memory:" => Ok(Self::Memory),
      path => Ok(Self::File(expand_tilde(Path::new(path)))),
    }
  }

  pub async fn open(&self) -> anyhow::Result<SqliteStore> {
    match self {
      Self::Memory => SqliteStore::open_in_memory()
        .await
        .context("failed to open in-memory store"),
      Self::File(path) => SqliteStore::open(path)
        .await
        .with_context(|| format!("failed to open store at {path:?}")),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

async fn health() -> Success<Value> {
  Success::ok(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// The complete application: `/health`, the API, CORS and request tracing.
pub fn app<S: FibreStore + 'static>(store: Arc<S>, config: &ServerConfig) -> anyhow::Result<Router> {
  let notifier = config.notifier();
  if notifier.is_enabled() {
    tracing::info!(recipients = config.notify_to.len(), "sendgrid notifications enabled");
  }

  let state = AppState::new(store)
    .with_notifier(notifier)
    .with_query_limit(config.query_limit);
  let cors = fibreflow_api::cors_layer(&config.cors_origins).context("invalid cors_origins entry")?;

  Ok(
    Router::new()
      .route("/health", get(health))
      .merge(fibreflow_api::router(state))
      .layer(cors)
      .layer(TraceLayer::new_for_http()),
  )
}
