//! Procurement documents: bills of quantities and requests for quotation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  supplier::RfqCriteria,
  validate::{self, Validate},
};

// ─── BOQ ─────────────────────────────────────────────────────────────────────

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
pub enum BoqStatus {
  #[default]
  Draft,
  Submitted,
  Approved,
  Rejected,
  Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoqItem {
  pub item_code:   String,
  pub description: String,
  /// Unit of measure, e.g. `m`, `each`.
  pub unit:        String,
  pub quantity:    f64,
  pub unit_price:  f64,
}

impl BoqItem {
  pub fn line_total(&self) -> f64 { self.quantity * self.unit_price }
}

/// Σ quantity × unit price; the stored total is always this value.
pub fn boq_total(items: &[BoqItem]) -> f64 { items.iter().map(BoqItem::line_total).sum() }

fn validate_items(items: &[BoqItem]) -> Result<()> {
  for (i, item) in items.iter().enumerate() {
    validate::required("items.item_code", &item.item_code)?;
    if !item.quantity.is_finite() || item.quantity < 0.0 {
      return Err(Error::invalid("items.quantity", format!("line {} has quantity {}", i + 1, item.quantity)));
    }
    if !item.unit_price.is_finite() || item.unit_price < 0.0 {
      return Err(Error::invalid("items.unit_price", format!("line {} has unit price {}", i + 1, item.unit_price)));
    }
  }
  Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boq {
  pub id:           Uuid,
  pub project_id:   Uuid,
  pub boq_number:   String,
  pub title:        String,
  pub version:      u32,
  pub status:       BoqStatus,
  pub currency:     String,
  pub items:        Vec<BoqItem>,
  pub total_amount: f64,
  pub notes:        Option<String>,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

fn default_version() -> u32 { 1 }

fn default_currency() -> String { "ZAR".to_owned() }

#[derive(Debug, Clone, Deserialize)]
pub struct NewBoq {
  pub project_id: Uuid,
  pub boq_number: String,
  pub title:      String,
  #[serde(default = "default_version")]
  pub version:    u32,
  #[serde(default)]
  pub status:     BoqStatus,
  #[serde(default = "default_currency")]
  pub currency:   String,
  #[serde(default)]
  pub items:      Vec<BoqItem>,
  pub notes:      Option<String>,
}

impl NewBoq {
  pub fn new(project_id: Uuid, boq_number: impl Into<String>, title: impl Into<String>) -> Self {
    Self {
      project_id,
      boq_number: boq_number.into(),
      title: title.into(),
      version: default_version(),
      status: BoqStatus::default(),
      currency: default_currency(),
      items: Vec::new(),
      notes: None,
    }
  }
}

impl Validate for NewBoq {
  fn validate(&self) -> Result<()> {
    validate::required("boq_number", &self.boq_number)?;
    validate::required("title", &self.title)?;
    validate::required("currency", &self.currency)?;
    validate_items(&self.items)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoqUpdate {
  pub boq_number: Option<String>,
  pub title:      Option<String>,
  pub version:    Option<u32>,
  pub status:     Option<BoqStatus>,
  pub currency:   Option<String>,
  /// Replaces the whole item list; the total is recomputed.
  pub items:      Option<Vec<BoqItem>>,
  pub notes:      Option<String>,
}

impl Validate for BoqUpdate {
  fn validate(&self) -> Result<()> {
    validate::not_blank("boq_number", self.boq_number.as_deref())?;
    validate::not_blank("title", self.title.as_deref())?;
    validate::not_blank("currency", self.currency.as_deref())?;
    self.items.as_deref().map_or(Ok(()), validate_items)
  }
}

// ─── RFQ ─────────────────────────────────────────────────────────────────────

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
pub enum RfqStatus {
  #[default]
  Draft,
  Issued,
  Closed,
  Awarded,
  Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rfq {
  pub id:                      Uuid,
  pub project_id:              Uuid,
  pub rfq_number:              String,
  pub title:                   String,
  pub description:             Option<String>,
  pub category:                Option<String>,
  pub required_certifications: Vec<String>,
  pub boq_id:                  Option<Uuid>,
  pub status:                  RfqStatus,
  pub due_date:                Option<NaiveDate>,
  pub invited_supplier_ids:    Vec<Uuid>,
  pub awarded_supplier_id:     Option<Uuid>,
  pub created_at:              DateTime<Utc>,
  pub updated_at:              DateTime<Utc>,
}

impl Rfq {
  pub fn criteria(&self) -> RfqCriteria {
    RfqCriteria {
      category:                self.category.clone(),
      required_certifications: self.required_certifications.clone(),
    }
  }
}

fn check_award(status: Option<RfqStatus>, awarded: Option<Uuid>) -> Result<()> {
  if status == Some(RfqStatus::Awarded) && awarded.is_none() {
    return Err(Error::MissingField("awarded_supplier_id"));
  }
  Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRfq {
  pub project_id:              Uuid,
  pub rfq_number:              String,
  pub title:                   String,
  pub description:             Option<String>,
  pub category:                Option<String>,
  #[serde(default)]
  pub required_certifications: Vec<String>,
  pub boq_id:                  Option<Uuid>,
  #[serde(default)]
  pub status:                  RfqStatus,
  pub due_date:                Option<NaiveDate>,
  #[serde(default)]
  pub invited_supplier_ids:    Vec<Uuid>,
  pub awarded_supplier_id:     Option<Uuid>,
}

impl NewRfq {
  pub fn new(project_id: Uuid, rfq_number: impl Into<String>, title: impl Into<String>) -> Self {
    Self {
      project_id,
      rfq_number: rfq_number.into(),
      title: title.into(),
      description: None,
      category: None,
      required_certifications: Vec::new(),
      boq_id: None,
      status: RfqStatus::default(),
      due_date: None,
      invited_supplier_ids: Vec::new(),
      awarded_supplier_id: None,
    }
  }
}

impl Validate for NewRfq {
  fn validate(&self) -> Result<()> {
    validate::required("rfq_number", &self.rfq_number)?;
    validate::required("title", &self.title)?;
    check_award(Some(self.status), self.awarded_supplier_id)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RfqUpdate {
  pub rfq_number:              Option<String>,
  pub title:                   Option<String>,
  pub description:             Option<String>,
  pub category:                Option<String>,
  pub required_certifications: Option<Vec<String>>,
  pub boq_id:                  Option<Uuid>,
  pub status:                  Option<RfqStatus>,
  pub due_date:                Option<NaiveDate>,
  pub invited_supplier_ids:    Option<Vec<Uuid>>,
  pub awarded_supplier_id:     Option<Uuid>,
}

impl RfqUpdate {
  /// Awarding needs a supplier either in this update or already stored.
  pub fn check_award_against(&self, current: &Rfq) -> Result<()> {
    check_award(self.status, self.awarded_supplier_id.or(current.awarded_supplier_id))
  }
}

impl Validate for RfqUpdate {
  fn validate(&self) -> Result<()> {
    validate::not_blank("rfq_number", self.rfq_number.as_deref())?;
    validate::not_blank("title", self.title.as_deref())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(qty: f64, price: f64) -> BoqItem {
    BoqItem {
      item_code:   "FC-96".into(),
      description: "96F ADSS cable".into(),
      unit:        "m".into(),
      quantity:    qty,
      unit_price:  price,
    }
  }

  #[test]
  fn total_sums_line_totals() {
    let items = vec![item(1000.0, 12.5), item(4.0, 250.0)];
    assert!((boq_total(&items) - 13_500.0).abs() < 1e-9);
    assert_eq!(boq_total(&[]), 0.0);
  }

  #[test]
  fn negative_quantities_are_rejected() {
    let mut boq = NewBoq::new(Uuid::new_v4(), "BOQ-1", "Phase 1");
    boq.items = vec![item(-1.0, 10.0)];
    assert!(boq.validate().is_err());
  }

  #[test]
  fn awarding_requires_a_supplier() {
    let mut rfq = NewRfq::new(Uuid::new_v4(), "RFQ-1", "Poles");
    rfq.status = RfqStatus::Awarded;
    assert!(matches!(rfq.validate(), Err(Error::MissingField("awarded_supplier_id"))));
    rfq.awarded_supplier_id = Some(Uuid::new_v4());
    assert!(rfq.validate().is_ok());
  }
}
