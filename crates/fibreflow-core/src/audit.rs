//! Audit trail entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditAction {
  Create,
  Update,
  Delete,
  Import,
  RagCalculate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
  pub id:          Uuid,
  /// Table-style entity name, e.g. `"client"` or `"sow_poles"`.
  pub entity_type: String,
  pub entity_id:   Option<Uuid>,
  pub action:      AuditAction,
  pub actor:       Option<String>,
  pub details:     serde_json::Value,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
  pub entity_type: String,
  pub entity_id:   Option<Uuid>,
  pub action:      AuditAction,
  pub actor:       Option<String>,
  pub details:     serde_json::Value,
}

impl NewAuditEntry {
  pub fn new(entity_type: impl Into<String>, entity_id: Option<Uuid>, action: AuditAction) -> Self {
    Self {
      entity_type: entity_type.into(),
      entity_id,
      action,
      actor: None,
      details: serde_json::Value::Null,
    }
  }

  pub fn actor(mut self, actor: Option<String>) -> Self {
    self.actor = actor;
    self
  }

  pub fn details(mut self, details: serde_json::Value) -> Self {
    self.details = details;
    self
  }
}

/// Filters for [`crate::store::AuditStore::list_audit`].
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
  pub entity_type: Option<String>,
  pub entity_id:   Option<Uuid>,
  pub limit:       Option<usize>,
}
