//! Staff members and their bulk-import normalisation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  import::ImportRow,
  record::{LooseRecord, Record},
  validate::{self, Validate},
};

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
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StaffStatus {
  #[default]
  Active,
  Inactive,
  OnLeave,
  Terminated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
  pub id:          Uuid,
  pub employee_id: String,
  pub name:        String,
  pub email:       Option<String>,
  pub phone:       Option<String>,
  pub department:  Option<String>,
  pub position:    Option<String>,
  pub status:      StaffStatus,
  pub join_date:   Option<NaiveDate>,
  pub manager_id:  Option<Uuid>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewStaff {
  pub employee_id: String,
  pub name:        String,
  pub email:       Option<String>,
  pub phone:       Option<String>,
  pub department:  Option<String>,
  pub position:    Option<String>,
  /// `None` means active for a new row and "keep the stored status" when an
  /// import updates an existing one.
  #[serde(default)]
  pub status:      Option<StaffStatus>,
  pub join_date:   Option<NaiveDate>,
  pub manager_id:  Option<Uuid>,
}

impl NewStaff {
  pub fn new(employee_id: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      employee_id: employee_id.into(),
      name: name.into(),
      ..Self::default()
    }
  }
}

impl ImportRow for NewStaff {
  /// Build a staff row from a spreadsheet or legacy JSON record.
  fn from_record(record: &Record) -> Result<Self> {
    let r = LooseRecord::new(record);

    let employee_id = r
      .text(&[
        "employeeid",
        "employeeno",
        "employeenumber",
        "empid",
        "empno",
        "staffid",
        "staffnumber",
      ])
      .ok_or(Error::MissingField("employee_id"))?;

    let name = r
      .text(&["name", "fullname", "employeename", "staffname"])
      .or_else(|| {
        let first = r.text(&["firstname", "givenname"]);
        let last = r.text(&["lastname", "surname", "familyname"]);
        match (first, last) {
          (Some(f), Some(l)) => Some(format!("{f} {l}")),
          (f, l) => f.or(l),
        }
      })
      .ok_or(Error::MissingField("name"))?;

    let status = r
      .text(&["status", "employmentstatus"])
      .map(|s| parse_status(&s))
      .transpose()?;

    let staff = Self {
      employee_id,
      name,
      email: r.text(&["email", "emailaddress"]),
      phone: r.text(&["phone", "phonenumber", "mobile", "cell", "cellphone", "contactnumber"]),
      department: r.text(&["department", "dept", "division"]),
      position: r.text(&["position", "title", "jobtitle", "role", "designation"]),
      status,
      join_date: r.date("join_date", &["joindate", "startdate", "hiredate", "datejoined"])?,
      manager_id: None,
    };
    staff.validate()?;
    Ok(staff)
  }

  fn natural_key(&self) -> &str { &self.employee_id }
}

/// Accepts the enum spelling plus a few human variants (`On Leave`).
fn parse_status(raw: &str) -> Result<StaffStatus> {
  let snake = raw.trim().replace([' ', '-'], "_");
  snake
    .parse()
    .map_err(|_| Error::invalid("status", format!("unknown staff status {raw:?}")))
}

impl Validate for NewStaff {
  fn validate(&self) -> Result<()> {
    validate::required("employee_id", &self.employee_id)?;
    validate::required("name", &self.name)?;
    validate::email("email", self.email.as_deref())
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffUpdate {
  pub employee_id: Option<String>,
  pub name:        Option<String>,
  pub email:       Option<String>,
  pub phone:       Option<String>,
  pub department:  Option<String>,
  pub position:    Option<String>,
  pub status:      Option<StaffStatus>,
  pub join_date:   Option<NaiveDate>,
  pub manager_id:  Option<Uuid>,
}

impl Validate for StaffUpdate {
  fn validate(&self) -> Result<()> {
    validate::not_blank("employee_id", self.employee_id.as_deref())?;
    validate::not_blank("name", self.name.as_deref())?;
    validate::email("email", self.email.as_deref())
  }
}
