//! Red/amber/green risk scoring for contractors.
//!
//! Four independent threshold rules are evaluated over a handful of
//! aggregates; the overall status is the worst of the four.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Minimum public-liability cover before compliance turns red.
pub const MIN_INSURANCE_COVERAGE: f64 = 1_000_000.0;
/// Open assignments above which financial exposure is flagged amber.
pub const MAX_ACTIVE_PROJECTS: u32 = 5;
/// Days before insurance expiry at which compliance turns amber.
pub const INSURANCE_WARNING_DAYS: i64 = 30;
pub const QUALITY_RED_BELOW: f64 = 60.0;
pub const QUALITY_AMBER_BELOW: f64 = 75.0;
pub const SAFETY_RED_AT: u32 = 3;

/// Ordered so that `max` picks the worst status.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RagStatus {
  Green,
  Amber,
  Red,
}

/// Aggregates gathered from the store for one contractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagInputs {
  pub overdue_projects:   u32,
  pub active_projects:    u32,
  pub insurance_coverage: f64,
  pub insurance_expiry:   Option<NaiveDate>,
  pub expired_documents:  u32,
  /// Mean quality score over completed, scored assignments.
  pub average_quality:    Option<f64>,
  pub safety_incidents:   u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagScores {
  pub overall:     RagStatus,
  pub financial:   RagStatus,
  pub compliance:  RagStatus,
  pub performance: RagStatus,
  pub safety:      RagStatus,
}

impl RagScores {
  /// Combine the four dimensions; the worst one wins.
  pub fn from_parts(
    financial: RagStatus,
    compliance: RagStatus,
    performance: RagStatus,
    safety: RagStatus,
  ) -> Self {
    let overall = financial.max(compliance).max(performance).max(safety);
    Self { overall, financial, compliance, performance, safety }
  }
}

/// Evaluate all four rules as of `today`.
pub fn evaluate(inputs: &RagInputs, today: NaiveDate) -> RagScores {
  RagScores::from_parts(
    financial(inputs),
    compliance(inputs, today),
    performance(inputs),
    safety(inputs),
  )
}

fn financial(i: &RagInputs) -> RagStatus {
  if i.overdue_projects > 0 {
    RagStatus::Red
  } else if i.active_projects > MAX_ACTIVE_PROJECTS {
    RagStatus::Amber
  } else {
    RagStatus::Green
  }
}

fn compliance(i: &RagInputs, today: NaiveDate) -> RagStatus {
  let days_left = i.insurance_expiry.map(|d| (d - today).num_days());
  // NaN coverage compares false against the minimum; treat it as none.
  let under_insured =
    !i.insurance_coverage.is_finite() || i.insurance_coverage < MIN_INSURANCE_COVERAGE;

  if under_insured || days_left.is_some_and(|d| d < 0) {
    RagStatus::Red
  } else if i.expired_documents > 0
    || days_left.is_some_and(|d| d <= INSURANCE_WARNING_DAYS)
  {
    RagStatus::Amber
  } else {
    RagStatus::Green
  }
}

fn performance(i: &RagInputs) -> RagStatus {
  match i.average_quality {
    Some(q) if q < QUALITY_RED_BELOW => RagStatus::Red,
    Some(q) if q < QUALITY_AMBER_BELOW => RagStatus::Amber,
    _ => RagStatus::Green,
  }
}

fn safety(i: &RagInputs) -> RagStatus {
  match i.safety_incidents {
    0 => RagStatus::Green,
    n if n >= SAFETY_RED_AT => RagStatus::Red,
    _ => RagStatus::Amber,
  }
}

// ─── History ─────────────────────────────────────────────────────────────────

/// One row of `contractor_rag_history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagHistoryEntry {
  pub id:               Uuid,
  pub contractor_id:    Uuid,
  pub previous_overall: Option<RagStatus>,
  pub scores:           RagScores,
  pub calculated_at:    DateTime<Utc>,
}

impl RagHistoryEntry {
  pub fn changed(&self) -> bool { self.previous_overall != Some(self.scores.overall) }

  /// True when this calculation moved the contractor into red.
  pub fn turned_red(&self) -> bool {
    self.scores.overall == RagStatus::Red && self.changed()
  }
}
