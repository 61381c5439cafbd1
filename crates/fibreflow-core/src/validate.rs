//! Input validation shared by the `New*` and `*Update` types.
//!
//! Uniqueness and referential integrity are left to the store; these checks
//! only cover what can be decided from the input alone.

use chrono::NaiveDate;

use crate::{Error, Result};

/// Implemented by every create/update input type.
pub trait Validate {
  fn validate(&self) -> Result<()>;
}

/// A required text field must be present and not blank.
pub fn required(field: &'static str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::MissingField(field));
  }
  Ok(())
}

/// An optional text field, when supplied (e.g. in an update), must not be
/// blank.
pub fn not_blank(field: &'static str, value: Option<&str>) -> Result<()> {
  match value {
    Some(v) => required(field, v),
    None => Ok(()),
  }
}

pub fn email(field: &'static str, value: Option<&str>) -> Result<()> {
  match value {
    Some(v) if !v.contains('@') => {
      Err(Error::invalid(field, format!("{v:?} is not an email address")))
    }
    _ => Ok(()),
  }
}

pub fn in_range(
  field: &'static str,
  value: Option<f64>,
  min: f64,
  max: f64,
) -> Result<()> {
  match value {
    Some(v) if !v.is_finite() || v < min || v > max => Err(Error::invalid(
      field,
      format!("{v} is outside {min}..={max}"),
    )),
    _ => Ok(()),
  }
}

pub fn non_negative(field: &'static str, value: Option<f64>) -> Result<()> {
  in_range(field, value, 0.0, f64::MAX)
}

pub fn date_order(
  start: Option<NaiveDate>,
  end: Option<NaiveDate>,
) -> Result<()> {
  match (start, end) {
    (Some(s), Some(e)) if e < s => Err(Error::invalid(
      "end_date",
      format!("{e} is before start date {s}"),
    )),
    _ => Ok(()),
  }
}
