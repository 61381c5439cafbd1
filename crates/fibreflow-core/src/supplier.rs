//! Suppliers, in-memory search, RFQ match scoring and benchmarking.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Result,
  validate::{self, Validate},
};

// ─── Supplier ────────────────────────────────────────────────────────────────

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
pub enum SupplierStatus {
  #[default]
  Active,
  Inactive,
  Blocked,
  PendingApproval,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
  pub id:                Uuid,
  pub name:              String,
  pub supplier_code:     String,
  pub contact_person:    Option<String>,
  pub email:             Option<String>,
  pub phone:             Option<String>,
  pub city:              Option<String>,
  pub province:          Option<String>,
  pub country:           Option<String>,
  pub categories:        Vec<String>,
  pub certifications:    Vec<String>,
  /// Buyer rating, 0–5.
  pub rating:            f64,
  /// Delivery/quality performance, 0–100.
  pub performance_score: f64,
  pub status:            SupplierStatus,
  pub preferred:         bool,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSupplier {
  pub name:              String,
  pub supplier_code:     String,
  pub contact_person:    Option<String>,
  pub email:             Option<String>,
  pub phone:             Option<String>,
  pub city:              Option<String>,
  pub province:          Option<String>,
  pub country:           Option<String>,
  #[serde(default)]
  pub categories:        Vec<String>,
  #[serde(default)]
  pub certifications:    Vec<String>,
  #[serde(default)]
  pub rating:            f64,
  #[serde(default)]
  pub performance_score: f64,
  #[serde(default)]
  pub status:            SupplierStatus,
  #[serde(default)]
  pub preferred:         bool,
}

impl NewSupplier {
  pub fn new(name: impl Into<String>, supplier_code: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      supplier_code: supplier_code.into(),
      ..Self::default()
    }
  }
}

impl Validate for NewSupplier {
  fn validate(&self) -> Result<()> {
    validate::required("name", &self.name)?;
    validate::required("supplier_code", &self.supplier_code)?;
    validate::email("email", self.email.as_deref())?;
    validate::in_range("rating", Some(self.rating), 0.0, 5.0)?;
    validate::in_range("performance_score", Some(self.performance_score), 0.0, 100.0)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupplierUpdate {
  pub name:              Option<String>,
  pub supplier_code:     Option<String>,
  pub contact_person:    Option<String>,
  pub email:             Option<String>,
  pub phone:             Option<String>,
  pub city:              Option<String>,
  pub province:          Option<String>,
  pub country:           Option<String>,
  pub categories:        Option<Vec<String>>,
  pub certifications:    Option<Vec<String>>,
  pub rating:            Option<f64>,
  pub performance_score: Option<f64>,
  pub status:            Option<SupplierStatus>,
  pub preferred:         Option<bool>,
}

impl Validate for SupplierUpdate {
  fn validate(&self) -> Result<()> {
    validate::not_blank("name", self.name.as_deref())?;
    validate::not_blank("supplier_code", self.supplier_code.as_deref())?;
    validate::email("email", self.email.as_deref())?;
    validate::in_range("rating", self.rating, 0.0, 5.0)?;
    validate::in_range("performance_score", self.performance_score, 0.0, 100.0)
  }
}

// ─── Search ──────────────────────────────────────────────────────────────────

/// Filters for [`search`]. Every set field must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupplierFilter {
  /// Case-insensitive substring over name, code, contact person and email.
  pub text:       Option<String>,
  pub category:   Option<String>,
  pub status:     Option<SupplierStatus>,
  pub min_rating: Option<f64>,
  pub preferred:  Option<bool>,
  /// Matched against city, province or country.
  pub location:   Option<String>,
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
  haystack.to_lowercase().contains(needle_lower)
}

fn has_ci(list: &[String], wanted: &str) -> bool {
  list.iter().any(|v| v.trim().eq_ignore_ascii_case(wanted.trim()))
}

impl SupplierFilter {
  pub fn matches(&self, s: &Supplier) -> bool {
    if let Some(text) = &self.text {
      let needle = text.trim().to_lowercase();
      let hit = contains_ci(&s.name, &needle)
        || contains_ci(&s.supplier_code, &needle)
        || s.contact_person.as_deref().is_some_and(|v| contains_ci(v, &needle))
        || s.email.as_deref().is_some_and(|v| contains_ci(v, &needle));
      if !hit {
        return false;
      }
    }
    if let Some(category) = &self.category
      && !has_ci(&s.categories, category)
    {
      return false;
    }
    if self.status.is_some_and(|st| st != s.status) {
      return false;
    }
    if self.min_rating.is_some_and(|min| s.rating < min) {
      return false;
    }
    if self.preferred.is_some_and(|p| p != s.preferred) {
      return false;
    }
    if let Some(location) = &self.location {
      let needle = location.trim().to_lowercase();
      let hit = [&s.city, &s.province, &s.country]
        .into_iter()
        .flatten()
        .any(|v| contains_ci(v, &needle));
      if !hit {
        return false;
      }
    }
    true
  }
}

/// Filter `suppliers` in memory; results are sorted by name.
pub fn search<'a>(suppliers: &'a [Supplier], filter: &SupplierFilter) -> Vec<&'a Supplier> {
  let mut hits: Vec<&Supplier> = suppliers.iter().filter(|s| filter.matches(s)).collect();
  hits.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
  hits
}

// ─── RFQ matching ────────────────────────────────────────────────────────────

pub const WEIGHT_CATEGORY: f64 = 0.35;
pub const WEIGHT_RATING: f64 = 0.25;
pub const WEIGHT_PERFORMANCE: f64 = 0.25;
pub const WEIGHT_CERTIFICATIONS: f64 = 0.15;

/// What an RFQ asks of a supplier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RfqCriteria {
  pub category:                Option<String>,
  #[serde(default)]
  pub required_certifications: Vec<String>,
}

/// Clamp to `[0, 1]` after scaling; non-finite input counts as zero.
fn unit(value: f64, scale: f64) -> f64 {
  if value.is_finite() { (value / scale).clamp(0.0, 1.0) } else { 0.0 }
}

/// Weighted match score of `supplier` against `criteria`, always in `[0, 1]`.
pub fn match_score(supplier: &Supplier, criteria: &RfqCriteria) -> f64 {
  let category = match criteria.category.as_deref().map(str::trim) {
    None | Some("") => 1.0,
    Some(c) if has_ci(&supplier.categories, c) => 1.0,
    Some(_) => 0.0,
  };

  let required = &criteria.required_certifications;
  let certifications = if required.is_empty() {
    1.0
  } else {
    let held = required
      .iter()
      .filter(|c| has_ci(&supplier.certifications, c))
      .count();
    held as f64 / required.len() as f64
  };

  let score = WEIGHT_CATEGORY * category
    + WEIGHT_RATING * unit(supplier.rating, 5.0)
    + WEIGHT_PERFORMANCE * unit(supplier.performance_score, 100.0)
    + WEIGHT_CERTIFICATIONS * certifications;
  score.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Serialize)]
pub struct SupplierMatch {
  pub supplier: Supplier,
  pub score:    f64,
}

/// Rank eligible suppliers for an RFQ. Blocked suppliers are excluded; ties
/// are broken by rating, then name.
pub fn rank(suppliers: &[Supplier], criteria: &RfqCriteria) -> Vec<SupplierMatch> {
  let mut ranked: Vec<SupplierMatch> = suppliers
    .iter()
    .filter(|s| s.status != SupplierStatus::Blocked)
    .map(|s| SupplierMatch { score: match_score(s, criteria), supplier: s.clone() })
    .collect();

  ranked.sort_by(|a, b| {
    b.score
      .total_cmp(&a.score)
      .then_with(|| b.supplier.rating.total_cmp(&a.supplier.rating))
      .then_with(|| a.supplier.name.cmp(&b.supplier.name))
  });
  ranked
}

// ─── Benchmarking ────────────────────────────────────────────────────────────

/// Composite of rating and performance, in `[0, 1]`.
pub fn composite_score(s: &Supplier) -> f64 {
  0.5 * unit(s.rating, 5.0) + 0.5 * unit(s.performance_score, 100.0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierBenchmark {
  pub supplier_id:  Uuid,
  pub score:        f64,
  /// 1-based position by composite score, best first.
  pub rank:         usize,
  /// Share of other suppliers scoring strictly lower, as a percentage.
  pub percentile:   f64,
  pub peer_count:   usize,
  /// Mean composite of the other suppliers; `None` without peers.
  pub peer_average: Option<f64>,
}

/// Benchmark `supplier_id` against everyone else in `suppliers`. Returns
/// `None` if the id is not in the list.
pub fn benchmark(suppliers: &[Supplier], supplier_id: Uuid) -> Option<SupplierBenchmark> {
  let target = suppliers.iter().find(|s| s.id == supplier_id)?;
  let score = composite_score(target);

  let peers: Vec<f64> = suppliers
    .iter()
    .filter(|s| s.id != supplier_id)
    .map(composite_score)
    .collect();

  let below = peers.iter().filter(|p| p.total_cmp(&score) == Ordering::Less).count();
  let above = peers.iter().filter(|p| p.total_cmp(&score) == Ordering::Greater).count();

  let (percentile, peer_average) = if peers.is_empty() {
    (100.0, None)
  } else {
    let n = peers.len() as f64;
    (below as f64 / n * 100.0, Some(peers.iter().sum::<f64>() / n))
  };

  Some(SupplierBenchmark {
    supplier_id,
    score,
    rank: above + 1,
    percentile,
    peer_count: peers.len(),
    peer_average,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn supplier(name: &str, rating: f64, performance: f64) -> Supplier {
    Supplier {
      id:                Uuid::new_v4(),
      name:              name.into(),
      supplier_code:     name.to_uppercase(),
      contact_person:    None,
      email:             Some(format!("{}@example.com", name.to_lowercase())),
      phone:             None,
      city:              Some("Johannesburg".into()),
      province:          Some("Gauteng".into()),
      country:           Some("South Africa".into()),
      categories:        vec!["Fibre Cable".into(), "Poles".into()],
      certifications:    vec!["ISO 9001".into()],
      rating,
      performance_score: performance,
      status:            SupplierStatus::Active,
      preferred:         false,
      created_at:        Utc::now(),
      updated_at:        Utc::now(),
    }
  }

  #[test]
  fn match_score_stays_in_unit_interval() {
    let categories = [None, Some("poles"), Some("Splicing"), Some("")];
    let values = [f64::NAN, f64::NEG_INFINITY, -10.0, 0.0, 2.5, 5.0, 50.0, 100.0, 1e9];
    let certs = [vec![], vec!["ISO 9001".to_string()], vec!["ISO 9001".into(), "ICASA".into()]];

    for category in categories {
      for rating in values {
        for performance in values {
          for required in &certs {
            let s = supplier("Acme", rating, performance);
            let criteria = RfqCriteria {
              category: category.map(str::to_owned),
              required_certifications: required.clone(),
            };
            let score = match_score(&s, &criteria);
            assert!((0.0..=1.0).contains(&score), "score {score} out of range");
          }
        }
      }
    }
  }

  #[test]
  fn perfect_supplier_scores_one() {
    let s = supplier("Acme", 5.0, 100.0);
    let criteria = RfqCriteria {
      category: Some("fibre cable".into()),
      required_certifications: vec!["iso 9001".into()],
    };
    assert!((match_score(&s, &criteria) - 1.0).abs() < 1e-9);
  }

  #[test]
  fn rank_excludes_blocked_and_orders_by_score() {
    let mut blocked = supplier("Blocked", 5.0, 100.0);
    blocked.status = SupplierStatus::Blocked;
    let list = vec![supplier("Low", 1.0, 20.0), blocked, supplier("High", 4.5, 90.0)];

    let ranked = rank(&list, &RfqCriteria::default());
    let names: Vec<_> = ranked.iter().map(|m| m.supplier.name.as_str()).collect();
    assert_eq!(names, ["High", "Low"]);
  }

  #[test]
  fn search_filters_by_text_category_and_location() {
    let mut other = supplier("Bravo", 3.0, 60.0);
    other.categories = vec!["Civils".into()];
    other.city = Some("Durban".into());
    other.province = Some("KwaZulu-Natal".into());
    let list = vec![supplier("Alpha", 4.0, 80.0), other];

    let f = SupplierFilter { category: Some("poles".into()), ..Default::default() };
    assert_eq!(search(&list, &f).len(), 1);

    let f = SupplierFilter { location: Some("durban".into()), ..Default::default() };
    assert_eq!(search(&list, &f)[0].name, "Bravo");

    let f = SupplierFilter { text: Some("ALPHA@".into()), ..Default::default() };
    assert_eq!(search(&list, &f)[0].name, "Alpha");

    let f = SupplierFilter { min_rating: Some(3.5), ..Default::default() };
    assert_eq!(search(&list, &f).len(), 1);
  }

  #[test]
  fn benchmark_reports_rank_and_percentile() {
    let list = vec![
      supplier("A", 5.0, 100.0),
      supplier("B", 3.0, 60.0),
      supplier("C", 1.0, 10.0),
    ];
    let b = benchmark(&list, list[1].id).unwrap();
    assert_eq!(b.rank, 2);
    assert_eq!(b.peer_count, 2);
    assert!((b.percentile - 50.0).abs() < 1e-9);

    let top = benchmark(&list, list[0].id).unwrap();
    assert_eq!(top.rank, 1);
    assert!((top.percentile - 100.0).abs() < 1e-9);
  }

  #[test]
  fn benchmark_alone_is_top_percentile() {
    let list = vec![supplier("Solo", 2.0, 40.0)];
    let b = benchmark(&list, list[0].id).unwrap();
    assert_eq!(b.percentile, 100.0);
    assert!(b.peer_average.is_none());
    assert!(benchmark(&list, Uuid::new_v4()).is_none());
  }
}
