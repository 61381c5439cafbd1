use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use fibreflow_core::record::Record;
use serde_json::Value;

use crate::{Error, Result};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn csv_records(bytes: &[u8]) -> Result<Vec<Record>> {
  let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
  let mut reader = csv::ReaderBuilder::new()
    .flexible(true)
    .trim(csv::Trim::All)
    .from_reader(bytes);

  let headers = reader.headers()?.clone();
  if headers.iter().all(str::is_empty) {
    return Err(Error::MissingHeader);
  }

  let mut records = Vec::new();
  for row in reader.records() {
    let row = row?;
    let record: Record = headers
      .iter()
      .zip(row.iter())
      .filter(|(h, v)| !h.is_empty() && !v.is_empty())
      .map(|(h, v)| (h.to_owned(), Value::String(v.to_owned())))
      .collect();
    if !record.is_empty() {
      records.push(record);
    }
  }
  Ok(records)
}

pub fn workbook_records(bytes: &[u8]) -> Result<Vec<Record>> {
  let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
  let range = workbook.worksheet_range_at(0).ok_or(Error::NoWorksheet)??;

  let mut rows = range.rows();
  let headers: Vec<String> = rows
    .next()
    .ok_or(Error::MissingHeader)?
    .iter()
    .map(|c| c.to_string().trim().to_owned())
    .collect();
  if headers.iter().all(String::is_empty) {
    return Err(Error::MissingHeader);
  }

  let records = rows
    .map(|row| {
      headers
        .iter()
        .zip(row)
        .filter(|(h, _)| !h.is_empty())
        .filter_map(|(h, cell)| cell_value(cell).map(|v| (h.clone(), v)))
        .collect::<Record>()
    })
    .filter(|r| !r.is_empty())
    .collect();
  Ok(records)
}

/// Excel dates become their serial number, which the record readers
/// understand.
fn cell_value(cell: &Data) -> Option<Value> {
  match cell {
    Data::Int(i) => Some(Value::from(*i)),
    Data::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number),
    Data::Bool(b) => Some(Value::Bool(*b)),
    Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
      let s = s.trim();
      (!s.is_empty()).then(|| Value::String(s.to_owned()))
    }
    Data::DateTime(d) => serde_json::Number::from_f64(d.as_f64()).map(Value::Number),
    Data::Error(_) | Data::Empty => None,
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use fibreflow_core::{
    import::{ImportRow, prepare},
    record::LooseRecord,
    sow::NewPole,
  };

  use super::*;

  #[test]
  fn csv_rows_become_records_keyed_by_header() {
    let input = "\u{feff}Pole Number,Status,Lat,Lng\n\
                 LAW.P.C001, planted ,-26.1,28.0\n\
                 ,,,\n\
                 LAW.P.C002,,-26.2,\n";
    let records = csv_records(input.as_bytes()).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["Pole Number"], "LAW.P.C001");
    assert_eq!(records[0]["Status"], "planted");
    assert!(!records[1].contains_key("Status"));

    let pole = NewPole::from_record(&records[1]).unwrap();
    assert_eq!(pole.latitude, Some(-26.2));
    assert_eq!(pole.longitude, None);
  }

  #[test]
  fn csv_short_rows_are_tolerated() {
    let records = csv_records(b"label_1,status\nP1\nP2,planned\n").unwrap();
    let prepared = prepare::<NewPole>(&records);
    assert_eq!(prepared.rows.len(), 2);
    assert!(prepared.report.is_clean());
  }

  #[test]
  fn csv_without_header_is_rejected() {
    assert!(matches!(csv_records(b""), Err(Error::MissingHeader)));
  }

  #[test]
  fn garbage_is_not_a_workbook() {
    assert!(matches!(workbook_records(b"definitely not a zip"), Err(Error::Workbook(_))));
  }

  /// Header row `Pole Number | Status | Install Date`, then a numeric pole
  /// number with a date cell, then a text pole number on its own.
  const POLES_XLSX: &[u8] = include_bytes!("../fixtures/poles.xlsx");

  #[test]
  fn workbook_rows_become_records_keyed_by_header() {
    let records = workbook_records(POLES_XLSX).unwrap();
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(first["Status"], "planted");
    assert!(first["Install Date"].is_number());
    assert_eq!(
      LooseRecord::new(first).date("install_date", &["installdate"]).unwrap(),
      NaiveDate::from_ymd_opt(2024, 1, 1)
    );

    let pole = NewPole::from_record(first).unwrap();
    assert_eq!(pole.pole_number, "1234");
    assert_eq!(pole.status.as_deref(), Some("planted"));

    assert_eq!(records[1].len(), 1);
    assert_eq!(records[1]["Pole Number"], "LAW.P.C002");
  }

  #[test]
  fn workbook_format_reads_through_the_entry_point() {
    let records = crate::read_records(POLES_XLSX, crate::Format::Excel).unwrap();
    assert_eq!(records.len(), 2);
  }

  #[test]
  fn cell_conversion() {
    assert_eq!(cell_value(&Data::Float(1234.0)), Some(Value::from(1234.0)));
    assert_eq!(cell_value(&Data::String("  ".into())), None);
    assert_eq!(cell_value(&Data::Empty), None);
    assert_eq!(cell_value(&Data::Float(f64::NAN)), None);
  }
}
