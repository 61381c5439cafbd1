//! Read models for the analytics dashboards.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  contractor::Contractor,
  rag::{INSURANCE_WARNING_DAYS, RagStatus},
};

/// How many contractors sit in each RAG band.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagDistribution {
  pub green:    u64,
  pub amber:    u64,
  pub red:      u64,
  pub unscored: u64,
}

impl RagDistribution {
  pub fn add(&mut self, status: Option<RagStatus>) {
    match status {
      Some(RagStatus::Green) => self.green += 1,
      Some(RagStatus::Amber) => self.amber += 1,
      Some(RagStatus::Red) => self.red += 1,
      None => self.unscored += 1,
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractorAnalytics {
  pub total:                      usize,
  pub by_status:                  BTreeMap<String, usize>,
  pub rag:                        RagDistribution,
  /// Contractors whose insurance lapses within the warning window (or has
  /// already lapsed).
  pub insurance_expiring:         usize,
  pub average_insurance_coverage: Option<f64>,
}

impl ContractorAnalytics {
  pub fn compute(contractors: &[Contractor], today: NaiveDate) -> Self {
    let mut out = Self { total: contractors.len(), ..Self::default() };
    let mut coverage_sum = 0.0;

    for c in contractors {
      *out.by_status.entry(c.status.to_string()).or_default() += 1;
      out.rag.add(c.rag.map(|r| r.overall));
      if c
        .insurance_expiry
        .is_some_and(|d| (d - today).num_days() <= INSURANCE_WARNING_DAYS)
      {
        out.insurance_expiring += 1;
      }
      coverage_sum += c.insurance_coverage;
    }

    if !contractors.is_empty() {
      out.average_insurance_coverage = Some(coverage_sum / contractors.len() as f64);
    }
    out
  }
}

/// Headline counts for the landing dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardSummary {
  pub clients:            u64,
  pub projects_by_status: BTreeMap<String, u64>,
  pub active_staff:       u64,
  pub contractors:        u64,
  pub suppliers:          u64,
  pub poles:              u64,
  pub drops:              u64,
  pub fibre_segments:     u64,
  pub fibre_length:       f64,
  pub rag:                RagDistribution,
}
