//! Outbound e-mail notifications.
//!
//! Only SendGrid's v3 mail-send endpoint is supported. A [`Notifier`] built
//! without credentials is disabled and accepts every message silently.

use serde_json::{Value, json};
use thiserror::Error;

pub const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Error)]
pub enum NotifyError {
  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("mail provider answered {status}: {body}")]
  Rejected { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct SendGrid {
  client:   reqwest::Client,
  endpoint: String,
  api_key:  String,
  from:     String,
  to:       Vec<String>,
}

impl SendGrid {
  pub fn new(api_key: impl Into<String>, from: impl Into<String>, to: Vec<String>) -> Self {
    Self {
      client: reqwest::Client::new(),
      endpoint: SENDGRID_ENDPOINT.to_owned(),
      api_key: api_key.into(),
      from: from.into(),
      to,
    }
  }

  fn payload(&self, subject: &str, body: &str) -> Value {
    let to: Vec<Value> = self.to.iter().map(|email| json!({ "email": email })).collect();
    json!({
      "personalizations": [{ "to": to }],
      "from": { "email": self.from },
      "subject": subject,
      "content": [{ "type": "text/plain", "value": body }],
    })
  }

  async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
    let resp = self
      .client
      .post(&self.endpoint)
      .bearer_auth(&self.api_key)
      .json(&self.payload(subject, body))
      .send()
      .await?;
    let status = resp.status();
    if status.is_success() {
      return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    Err(NotifyError::Rejected { status: status.as_u16(), body })
  }
}

#[derive(Debug, Clone, Default)]
pub enum Notifier {
  #[default]
  Disabled,
  SendGrid(SendGrid),
}

impl Notifier {
  /// SendGrid when a key, a sender and at least one recipient are all
  /// configured; disabled otherwise.
  pub fn from_settings(api_key: Option<&str>, from: Option<&str>, to: &[String]) -> Self {
    match (api_key.map(str::trim), from.map(str::trim)) {
      (Some(key), Some(from)) if !key.is_empty() && !from.is_empty() && !to.is_empty() => {
        Notifier::SendGrid(SendGrid::new(key, from, to.to_vec()))
      }
      _ => Notifier::Disabled,
    }
  }

  pub fn is_enabled(&self) -> bool { matches!(self, Notifier::SendGrid(_)) }

  pub async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
    match self {
      Notifier::Disabled => {
        tracing::debug!(subject, "notifications disabled, dropping message");
        Ok(())
      }
      Notifier::SendGrid(sg) => sg.send(subject, body).await,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn needs_key_sender_and_recipients() {
    let to = vec!["ops@example.com".to_owned()];
    assert!(Notifier::from_settings(Some("SG.key"), Some("noreply@example.com"), &to).is_enabled());
    assert!(!Notifier::from_settings(None, Some("noreply@example.com"), &to).is_enabled());
    assert!(!Notifier::from_settings(Some(" "), Some("noreply@example.com"), &to).is_enabled());
    assert!(!Notifier::from_settings(Some("SG.key"), Some("noreply@example.com"), &[]).is_enabled());
  }

  #[test]
  fn sendgrid_payload_shape() {
    let sg = SendGrid::new("k", "noreply@example.com", vec!["a@example.com".into(), "b@example.com".into()]);
    let p = sg.payload("RAG alert", "Acme turned red");
    assert_eq!(p["personalizations"][0]["to"][1]["email"], "b@example.com");
    assert_eq!(p["from"]["email"], "noreply@example.com");
    assert_eq!(p["subject"], "RAG alert");
    assert_eq!(p["content"][0]["value"], "Acme turned red");
  }

  #[tokio::test]
  async fn disabled_notifier_accepts_messages() {
    Notifier::Disabled.notify("subject", "body").await.unwrap();
  }
}
