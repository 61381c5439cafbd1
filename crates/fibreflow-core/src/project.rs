//! Fibre build projects.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Result,
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
#[strum(serialize_all = "snake_case")]
pub enum ProjectStatus {
  #[default]
  Planning,
  Active,
  OnHold,
  Completed,
  Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
  pub id:                 Uuid,
  pub project_code:       String,
  pub name:               String,
  pub client_id:          Option<Uuid>,
  pub status:             ProjectStatus,
  pub start_date:         Option<NaiveDate>,
  pub end_date:           Option<NaiveDate>,
  pub budget:             Option<f64>,
  pub location:           Option<String>,
  pub project_manager_id: Option<Uuid>,
  pub description:        Option<String>,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProject {
  pub project_code:       String,
  pub name:               String,
  pub client_id:          Option<Uuid>,
  #[serde(default)]
  pub status:             ProjectStatus,
  pub start_date:         Option<NaiveDate>,
  pub end_date:           Option<NaiveDate>,
  pub budget:             Option<f64>,
  pub location:           Option<String>,
  pub project_manager_id: Option<Uuid>,
  pub description:        Option<String>,
}

impl NewProject {
  pub fn new(project_code: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      project_code: project_code.into(),
      name: name.into(),
      ..Self::default()
    }
  }
}

impl Validate for NewProject {
  fn validate(&self) -> Result<()> {
    validate::required("project_code", &self.project_code)?;
    validate::required("name", &self.name)?;
    validate::non_negative("budget", self.budget)?;
    validate::date_order(self.start_date, self.end_date)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectUpdate {
  pub project_code:       Option<String>,
  pub name:               Option<String>,
  pub client_id:          Option<Uuid>,
  pub status:             Option<ProjectStatus>,
  pub start_date:         Option<NaiveDate>,
  pub end_date:           Option<NaiveDate>,
  pub budget:             Option<f64>,
  pub location:           Option<String>,
  pub project_manager_id: Option<Uuid>,
  pub description:        Option<String>,
}

impl Validate for ProjectUpdate {
  fn validate(&self) -> Result<()> {
    validate::not_blank("project_code", self.project_code.as_deref())?;
    validate::not_blank("name", self.name.as_deref())?;
    validate::non_negative("budget", self.budget)?;
    validate::date_order(self.start_date, self.end_date)
  }
}
