//! Contractors, their project assignments and compliance documents.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  rag::RagScores,
  validate::{self, Validate},
};

// ─── Contractor ──────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContractorStatus {
  #[default]
  Pending,
  Approved,
  Suspended,
  Blacklisted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contractor {
  pub id:                  Uuid,
  pub company_name:        String,
  pub registration_number: String,
  pub contact_person:      Option<String>,
  pub email:               Option<String>,
  pub phone:               Option<String>,
  pub business_type:       Option<String>,
  pub services:            Vec<String>,
  pub insurance_coverage:  f64,
  pub insurance_expiry:    Option<NaiveDate>,
  /// B-BBEE contributor level, 1 (best) to 8.
  pub bbbee_level:         Option<u8>,
  pub status:              ContractorStatus,
  /// Scores from the most recent RAG calculation, if any.
  pub rag:                 Option<RagScores>,
  pub rag_updated_at:      Option<DateTime<Utc>>,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewContractor {
  pub company_name:        String,
  pub registration_number: String,
  pub contact_person:      Option<String>,
  pub email:               Option<String>,
  pub phone:               Option<String>,
  pub business_type:       Option<String>,
  #[serde(default)]
  pub services:            Vec<String>,
  #[serde(default)]
  pub insurance_coverage:  f64,
  pub insurance_expiry:    Option<NaiveDate>,
  pub bbbee_level:         Option<u8>,
  #[serde(default)]
  pub status:              ContractorStatus,
}

impl NewContractor {
  pub fn new(
    company_name: impl Into<String>,
    registration_number: impl Into<String>,
  ) -> Self {
    Self {
      company_name: company_name.into(),
      registration_number: registration_number.into(),
      ..Self::default()
    }
  }
}

fn check_bbbee(level: Option<u8>) -> Result<()> {
  match level {
    Some(l) if !(1..=8).contains(&l) => {
      Err(Error::invalid("bbbee_level", format!("{l} is outside 1..=8")))
    }
    _ => Ok(()),
  }
}

impl Validate for NewContractor {
  fn validate(&self) -> Result<()> {
    validate::required("company_name", &self.company_name)?;
    validate::required("registration_number", &self.registration_number)?;
    validate::email("email", self.email.as_deref())?;
    validate::non_negative("insurance_coverage", Some(self.insurance_coverage))?;
    check_bbbee(self.bbbee_level)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractorUpdate {
  pub company_name:        Option<String>,
  pub registration_number: Option<String>,
  pub contact_person:      Option<String>,
  pub email:               Option<String>,
  pub phone:               Option<String>,
  pub business_type:       Option<String>,
  pub services:            Option<Vec<String>>,
  pub insurance_coverage:  Option<f64>,
  pub insurance_expiry:    Option<NaiveDate>,
  pub bbbee_level:         Option<u8>,
  pub status:              Option<ContractorStatus>,
}

impl Validate for ContractorUpdate {
  fn validate(&self) -> Result<()> {
    validate::not_blank("company_name", self.company_name.as_deref())?;
    validate::not_blank("registration_number", self.registration_number.as_deref())?;
    validate::email("email", self.email.as_deref())?;
    validate::non_negative("insurance_coverage", self.insurance_coverage)?;
    check_bbbee(self.bbbee_level)
  }
}

// ─── Assignments ─────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AssignmentStatus {
  #[default]
  Assigned,
  InProgress,
  Completed,
  Cancelled,
}

impl AssignmentStatus {
  /// Open assignments count towards workload and can become overdue.
  pub fn is_open(self) -> bool { matches!(self, Self::Assigned | Self::InProgress) }
}

/// A contractor's engagement on a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
  pub id:               Uuid,
  pub contractor_id:    Uuid,
  pub project_id:       Uuid,
  pub status:           AssignmentStatus,
  pub start_date:       Option<NaiveDate>,
  pub end_date:         Option<NaiveDate>,
  /// Quality score awarded on completion, 0–100.
  pub quality_score:    Option<f64>,
  pub safety_incidents: u32,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAssignment {
  pub contractor_id:    Uuid,
  pub project_id:       Uuid,
  #[serde(default)]
  pub status:           AssignmentStatus,
  pub start_date:       Option<NaiveDate>,
  pub end_date:         Option<NaiveDate>,
  pub quality_score:    Option<f64>,
  #[serde(default)]
  pub safety_incidents: u32,
}

impl NewAssignment {
  pub fn new(contractor_id: Uuid, project_id: Uuid) -> Self {
    Self {
      contractor_id,
      project_id,
      status: AssignmentStatus::default(),
      start_date: None,
      end_date: None,
      quality_score: None,
      safety_incidents: 0,
    }
  }
}

impl Validate for NewAssignment {
  fn validate(&self) -> Result<()> {
    validate::in_range("quality_score", self.quality_score, 0.0, 100.0)?;
    validate::date_order(self.start_date, self.end_date)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentUpdate {
  pub status:           Option<AssignmentStatus>,
  pub start_date:       Option<NaiveDate>,
  pub end_date:         Option<NaiveDate>,
  pub quality_score:    Option<f64>,
  pub safety_incidents: Option<u32>,
}

impl Validate for AssignmentUpdate {
  fn validate(&self) -> Result<()> {
    validate::in_range("quality_score", self.quality_score, 0.0, 100.0)?;
    validate::date_order(self.start_date, self.end_date)
  }
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// A compliance document on file (tax clearance, insurance certificate, …).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractorDocument {
  pub id:              Uuid,
  pub contractor_id:   Uuid,
  pub document_type:   String,
  pub document_number: Option<String>,
  pub expiry_date:     Option<NaiveDate>,
  pub verified:        bool,
  pub created_at:      DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDocument {
  pub contractor_id:   Uuid,
  pub document_type:   String,
  pub document_number: Option<String>,
  pub expiry_date:     Option<NaiveDate>,
  #[serde(default)]
  pub verified:        bool,
}

impl Validate for NewDocument {
  fn validate(&self) -> Result<()> {
    validate::required("document_type", &self.document_type)
  }
}
