//! Async HTTP client wrapping the FibreFlow JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use fibreflow_core::{
  analytics::DashboardSummary, client::Client as FibreClient, import::ImportReport,
  rag::RagScores,
};
use fibreflow_import::Format;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use uuid::Uuid;

/// Connection settings for the FibreFlow API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  /// Sent as `X-Actor` so the server's audit log names the caller.
  pub actor:    Option<String>,
}

/// What an import writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ImportKind {
  Poles,
  Drops,
  Fibre,
  Staff,
}

impl ImportKind {
  /// API path for a raw file upload of this kind.
  pub fn upload_path(self) -> &'static str {
    match self {
      ImportKind::Poles => "/sow/poles/import",
      ImportKind::Drops => "/sow/drops/import",
      ImportKind::Fibre => "/sow/fibre/import",
      ImportKind::Staff => "/staff/import/file",
    }
  }

  pub fn needs_project(self) -> bool { self != ImportKind::Staff }
}

/// One contractor's result from a RAG recalculation.
#[derive(Debug, Deserialize)]
pub struct RagLine {
  pub contractor_id: Uuid,
  pub company_name:  String,
  pub scores:        RagScores,
  pub changed:       bool,
}

/// The server's `{ success, data?, error?, message? }` envelope.
#[derive(Debug, Deserialize)]
struct Reply<T> {
  success: bool,
  data:    Option<T>,
  error:   Option<String>,
  message: Option<String>,
}

/// Decode an envelope, turning `success: false` or a non-2xx status into an
/// error carrying the server's message.
fn open_reply<T: DeserializeOwned>(what: &str, status: StatusCode, body: &[u8]) -> Result<T> {
  let reply: Reply<T> = serde_json::from_slice(body)
    .with_context(|| format!("{what} → {status}: response is not a FibreFlow envelope"))?;
  if !status.is_success() || !reply.success {
    let error = reply.error.unwrap_or_else(|| "unknown error".to_owned());
    return Err(anyhow!("{what} → {status}: {error}"));
  }
  if let Some(message) = &reply.message {
    tracing::debug!(%message, "{what}");
  }
  reply.data.ok_or_else(|| anyhow!("{what} → {status}: response has no data"))
}

/// Async HTTP client for the FibreFlow JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(120))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn actor(&self, req: RequestBuilder) -> RequestBuilder {
    match &self.config.actor {
      Some(actor) => req.header("x-actor", actor),
      None => req,
    }
  }

  async fn call<T: DeserializeOwned>(&self, what: &str, req: RequestBuilder) -> Result<T> {
    let resp = self
      .actor(req)
      .send()
      .await
      .with_context(|| format!("{what} failed"))?;
    let status = resp.status();
    let body = resp.bytes().await.with_context(|| format!("{what}: reading body"))?;
    open_reply(what, status, &body)
  }

  // ── Clients ───────────────────────────────────────────────────────────────

  /// `GET /api/clients`
  pub async fn list_clients(&self) -> Result<Vec<FibreClient>> {
    self.call("GET /clients", self.client.get(self.url("/clients"))).await
  }

  // ── Imports ───────────────────────────────────────────────────────────────

  /// `POST /api/sow/{kind}/import` or `/api/staff/import/file` with the raw
  /// file as the body.
  pub async fn import_file(
    &self,
    kind: ImportKind,
    format: Format,
    project_id: Option<Uuid>,
    body: Vec<u8>,
  ) -> Result<ImportReport> {
    let mut query = vec![("format", format.to_string())];
    if let Some(id) = project_id {
      query.push(("project_id", id.to_string()));
    }
    let what = format!("POST {}", kind.upload_path());
    let req = self
      .client
      .post(self.url(kind.upload_path()))
      .query(&query)
      .body(body);
    self.call(&what, req).await
  }

  /// `GET /api/staff/export`; returns the CSV body.
  pub async fn export_staff(&self) -> Result<Vec<u8>> {
    let what = "GET /staff/export";
    let resp = self
      .actor(self.client.get(self.url("/staff/export")))
      .send()
      .await
      .with_context(|| format!("{what} failed"))?;
    let status = resp.status();
    let body = resp.bytes().await.with_context(|| format!("{what}: reading body"))?;
    if !status.is_success() {
      // Failures still come back as an envelope.
      let err = open_reply::<serde_json::Value>(what, status, &body)
        .err()
        .unwrap_or_else(|| anyhow!("{what} → {status}"));
      return Err(err);
    }
    Ok(body.to_vec())
  }

  // ── Contractors ───────────────────────────────────────────────────────────

  /// `POST /api/contractors/rag/calculate[?contractor_id=]`
  pub async fn calculate_rag(&self, contractor_id: Option<Uuid>) -> Result<Vec<RagLine>> {
    let mut req = self.client.post(self.url("/contractors/rag/calculate"));
    if let Some(id) = contractor_id {
      req = req.query(&[("contractor_id", id.to_string())]);
    }
    self.call("POST /contractors/rag/calculate", req).await
  }

  // ── Analytics ─────────────────────────────────────────────────────────────

  /// `GET /api/analytics/dashboard`
  pub async fn dashboard(&self) -> Result<DashboardSummary> {
    self
      .call("GET /analytics/dashboard", self.client.get(self.url("/analytics/dashboard")))
      .await
  }
}

#[cfg(test)]
mod tests {
  use serde_json::{Value, json};

  use super::*;

  #[test]
  fn success_envelopes_yield_their_data() {
    let body = json!({ "success": true, "data": [1, 2, 3], "message": "ok" }).to_string();
    let data: Vec<u32> = open_reply("GET /x", StatusCode::OK, body.as_bytes()).unwrap();
    assert_eq!(data, [1, 2, 3]);
  }

  #[test]
  fn failure_envelopes_carry_the_server_message() {
    let body = json!({ "success": false, "error": "project_id is required" }).to_string();
    let err = open_reply::<Value>("POST /sow/poles/import", StatusCode::BAD_REQUEST, body.as_bytes())
      .unwrap_err();
    let text = err.to_string();
    assert!(text.contains("400"), "{text}");
    assert!(text.contains("project_id is required"), "{text}");
  }

  #[test]
  fn non_envelope_bodies_are_errors() {
    let err = open_reply::<Value>("GET /x", StatusCode::BAD_GATEWAY, b"<html>").unwrap_err();
    assert!(err.to_string().contains("502"));
  }

  #[test]
  fn upload_paths_follow_the_kind() {
    assert_eq!(ImportKind::Fibre.upload_path(), "/sow/fibre/import");
    assert_eq!(ImportKind::Staff.upload_path(), "/staff/import/file");
    assert!(ImportKind::Drops.needs_project());
    assert!(!ImportKind::Staff.needs_project());
  }

  #[test]
  fn base_url_trailing_slash_is_ignored() {
    let client = ApiClient::new(ApiConfig { base_url: "http://localhost:3000/".into(), actor: None })
      .unwrap();
    assert_eq!(client.url("/clients"), "http://localhost:3000/api/clients");
  }
}
