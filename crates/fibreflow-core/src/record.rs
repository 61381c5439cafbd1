//! Loosely-shaped import records and column-alias lookup.
//!
//! Spreadsheets and legacy JSON payloads name the same column many ways
//! (`Pole Number`, `pole_number`, `poleNumber`, `Label_1`). Keys are reduced
//! to lowercase ASCII alphanumerics before matching, so each field only needs
//! its distinct spellings listed once.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde_json::Value;

use crate::{Error, Result};

/// A single row as received from a client or read from a spreadsheet.
pub type Record = serde_json::Map<String, Value>;

/// Reduce a column name to its canonical form: `"Pole Number"` → `"polenumber"`.
pub fn normalize_key(key: &str) -> String {
  key
    .chars()
    .filter(char::is_ascii_alphanumeric)
    .map(|c| c.to_ascii_lowercase())
    .collect()
}

/// A [`Record`] with normalised keys, queried by alias lists.
#[derive(Debug, Default)]
pub struct LooseRecord {
  fields: HashMap<String, Value>,
}

impl LooseRecord {
  pub fn new(record: &Record) -> Self {
    let mut fields = HashMap::with_capacity(record.len());
    for (key, value) in record {
      if is_empty(value) {
        continue;
      }
      // First non-empty spelling wins when two columns collapse together.
      fields.entry(normalize_key(key)).or_insert_with(|| value.clone());
    }
    Self { fields }
  }

  fn lookup(&self, aliases: &[&str]) -> Option<&Value> {
    aliases.iter().find_map(|a| self.fields.get(*a))
  }

  /// First alias present, rendered as trimmed text.
  pub fn text(&self, aliases: &[&str]) -> Option<String> {
    self.lookup(aliases).and_then(value_text)
  }

  pub fn number(&self, field: &'static str, aliases: &[&str]) -> Result<Option<f64>> {
    match self.lookup(aliases) {
      None => Ok(None),
      Some(Value::Number(n)) => Ok(n.as_f64()),
      Some(other) => {
        let Some(raw) = value_text(other) else { return Ok(None) };
        parse_number(&raw)
          .map(Some)
          .ok_or_else(|| Error::invalid(field, format!("{raw:?} is not a number")))
      }
    }
  }

  pub fn integer(&self, field: &'static str, aliases: &[&str]) -> Result<Option<u32>> {
    match self.number(field, aliases)? {
      None => Ok(None),
      Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) => {
        Ok(Some(n as u32))
      }
      Some(n) => Err(Error::invalid(field, format!("{n} is not a whole number"))),
    }
  }

  pub fn date(&self, field: &'static str, aliases: &[&str]) -> Result<Option<NaiveDate>> {
    match self.lookup(aliases) {
      None => Ok(None),
      Some(Value::Number(n)) => n
        .as_f64()
        .and_then(excel_serial_date)
        .map(Some)
        .ok_or_else(|| Error::invalid(field, format!("{n} is not a date"))),
      Some(other) => {
        let Some(raw) = value_text(other) else { return Ok(None) };
        parse_date(&raw)
          .map(Some)
          .ok_or_else(|| Error::invalid(field, format!("{raw:?} is not a date")))
      }
    }
  }
}

fn is_empty(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::String(s) => s.trim().is_empty(),
    _ => false,
  }
}

/// Render a scalar as text. Whole floats lose their `.0` so that numeric
/// pole numbers read from a spreadsheet (`1234.0`) match their text form.
pub fn value_text(value: &Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::String(s) => {
      let t = s.trim();
      (!t.is_empty()).then(|| t.to_owned())
    }
    Value::Number(n) => Some(match n.as_f64() {
      Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
        format!("{}", f as i64)
      }
      _ => n.to_string(),
    }),
    Value::Bool(b) => Some(b.to_string()),
    Value::Array(_) | Value::Object(_) => Some(value.to_string()),
  }
}

/// Accepts `12.5`, `12,5` (decimal comma), `1,234.5` and `1,234,567`
/// (thousands commas). Without a dot, commas are thousands separators only
/// when every group after the first has exactly three digits, so `1,234` is
/// 1234 while `1,23` and `0,500` are decimals.
fn parse_number(raw: &str) -> Option<f64> {
  let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
  let normalised = if compact.contains('.') || is_digit_grouped(&compact) {
    compact.replace(',', "")
  } else {
    compact.replace(',', ".")
  };
  normalised.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn is_digit_grouped(s: &str) -> bool {
  let all_digits = |g: &str| !g.is_empty() && g.bytes().all(|b| b.is_ascii_digit());
  let mut groups = s.split(',');
  let head = groups.next().unwrap_or_default().trim_start_matches(['-', '+']);
  let tail: Vec<&str> = groups.collect();
  !tail.is_empty()
    && all_digits(head)
    && head.len() <= 3
    && !head.starts_with('0')
    && tail.iter().all(|g| g.len() == 3 && all_digits(g))
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];

fn parse_date(raw: &str) -> Option<NaiveDate> {
  // Timestamps such as `2024-03-01T00:00:00` keep only their date part.
  let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);
  DATE_FORMATS
    .iter()
    .find_map(|f| NaiveDate::parse_from_str(date_part, f).ok())
}

/// Spreadsheet serial dates count days from 1899-12-30.
fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
  if !(1.0..=2_958_465.0).contains(&serial) {
    return None;
  }
  NaiveDate::from_ymd_opt(1899, 12, 30)?
    .checked_add_signed(Duration::days(serial.trunc() as i64))
}
