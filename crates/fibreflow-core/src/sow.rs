//! Scope-of-work build records: poles, drops and fibre segments.
//!
//! Each record is keyed within its project by a natural identifier taken from
//! the planning spreadsheets; imports upsert on `(project_id, key)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  import::ImportRow,
  record::{LooseRecord, Record},
};

/// Which SOW table an operation targets.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SowKind {
  Poles,
  Drops,
  Fibre,
}

const LATITUDE: &[&str] = &["latitude", "lat", "gpslatitude", "gpslat", "y"];
const LONGITUDE: &[&str] = &["longitude", "lon", "lng", "long", "gpslongitude", "gpslong", "x"];
const STATUS: &[&str] = &["status", "currentstatus", "buildstatus"];

// ─── Pole ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pole {
  pub id:          Uuid,
  pub project_id:  Uuid,
  pub pole_number: String,
  pub status:      Option<String>,
  pub pole_type:   Option<String>,
  /// Height in metres.
  pub height:      Option<f64>,
  pub latitude:    Option<f64>,
  pub longitude:   Option<f64>,
  pub zone:        Option<String>,
  pub pon:         Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// A pole row to upsert on `(project_id, pole_number)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPole {
  pub pole_number: String,
  pub status:      Option<String>,
  pub pole_type:   Option<String>,
  pub height:      Option<f64>,
  pub latitude:    Option<f64>,
  pub longitude:   Option<f64>,
  pub zone:        Option<String>,
  pub pon:         Option<String>,
}

impl ImportRow for NewPole {
  fn from_record(record: &Record) -> Result<Self> {
    let r = LooseRecord::new(record);
    Ok(Self {
      pole_number: r
        .text(&["polenumber", "pole", "poleno", "poleid", "label1", "label"])
        .ok_or(Error::MissingField("pole_number"))?,
      status:      r.text(STATUS),
      pole_type:   r.text(&["poletype", "type", "typeofpole"]),
      height:      r.number("height", &["height", "poleheight", "heightm"])?,
      latitude:    r.number("latitude", LATITUDE)?,
      longitude:   r.number("longitude", LONGITUDE)?,
      zone:        r.text(&["zone", "area", "zoneno"]),
      pon:         r.text(&["pon", "ponno", "ponnumber"]),
    })
  }

  fn natural_key(&self) -> &str { &self.pole_number }
}

// ─── Drop ────────────────────────────────────────────────────────────────────

/// A customer drop: the cable run from a distribution pole to a premises.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDrop {
  pub id:           Uuid,
  pub project_id:   Uuid,
  pub drop_number:  String,
  /// The pole this drop hangs off, if known.
  pub pole_number:  Option<String>,
  pub address:      Option<String>,
  pub status:       Option<String>,
  /// Cable length in metres.
  pub cable_length: Option<f64>,
  pub latitude:     Option<f64>,
  pub longitude:    Option<f64>,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCustomerDrop {
  pub drop_number:  String,
  pub pole_number:  Option<String>,
  pub address:      Option<String>,
  pub status:       Option<String>,
  pub cable_length: Option<f64>,
  pub latitude:     Option<f64>,
  pub longitude:    Option<f64>,
}

impl ImportRow for NewCustomerDrop {
  fn from_record(record: &Record) -> Result<Self> {
    let r = LooseRecord::new(record);
    Ok(Self {
      drop_number:  r
        .text(&["dropnumber", "drop", "dropno", "dropid", "label1", "label"])
        .ok_or(Error::MissingField("drop_number"))?,
      pole_number:  r.text(&["polenumber", "pole", "poleno", "strtfeat", "startfeature"]),
      address:      r.text(&["address", "premisesaddress", "streetaddress", "stand"]),
      status:       r.text(STATUS),
      cable_length: r.number(
        "cable_length",
        &["cablelength", "dropcablelength", "length", "distance"],
      )?,
      latitude:     r.number("latitude", LATITUDE)?,
      longitude:    r.number("longitude", LONGITUDE)?,
    })
  }

  fn natural_key(&self) -> &str { &self.drop_number }
}

// ─── Fibre ───────────────────────────────────────────────────────────────────

/// A fibre cable segment between two network points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FibreSegment {
  pub id:          Uuid,
  pub project_id:  Uuid,
  pub segment_id:  String,
  pub from_point:  Option<String>,
  pub to_point:    Option<String>,
  pub cable_type:  Option<String>,
  pub fibre_count: Option<u32>,
  /// Length in metres.
  pub length:      Option<f64>,
  pub status:      Option<String>,
  pub contractor:  Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewFibreSegment {
  pub segment_id:  String,
  pub from_point:  Option<String>,
  pub to_point:    Option<String>,
  pub cable_type:  Option<String>,
  pub fibre_count: Option<u32>,
  pub length:      Option<f64>,
  pub status:      Option<String>,
  pub contractor:  Option<String>,
}

impl ImportRow for NewFibreSegment {
  fn from_record(record: &Record) -> Result<Self> {
    let r = LooseRecord::new(record);
    Ok(Self {
      segment_id:  r
        .text(&["segmentid", "segment", "cableid", "label1", "label"])
        .ok_or(Error::MissingField("segment_id"))?,
      from_point:  r.text(&["frompoint", "from", "start", "strtfeat", "startfeature"]),
      to_point:    r.text(&["topoint", "to", "end", "endfeat", "endfeature"]),
      cable_type:  r.text(&["cabletype", "cablesize", "type"]),
      fibre_count: r.integer("fibre_count", &["fibrecount", "fibercount", "cores", "corecount"])?,
      length:      r.number("length", &["length", "lengthm", "distance", "cablelength"])?,
      status:      r.text(STATUS),
      contractor:  r.text(&["contractor", "installer", "contractorname"]),
    })
  }

  fn natural_key(&self) -> &str { &self.segment_id }
}

// ─── Summary ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SowSummary {
  pub project_id:     Uuid,
  pub poles:          u64,
  pub drops:          u64,
  pub fibre_segments: u64,
  /// Total fibre length in metres over segments with a known length.
  pub fibre_length:   f64,
}
