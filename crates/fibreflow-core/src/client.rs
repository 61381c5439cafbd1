//! Clients — the companies FibreFlow builds networks for.

use chrono::{DateTime, Utc};
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
pub enum ClientStatus {
  #[default]
  Active,
  Inactive,
  Prospect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
  pub id:             Uuid,
  pub company_name:   String,
  pub contact_person: Option<String>,
  pub email:          Option<String>,
  pub phone:          Option<String>,
  pub address:        Option<String>,
  pub city:           Option<String>,
  pub province:       Option<String>,
  pub industry:       Option<String>,
  pub status:         ClientStatus,
  pub notes:          Option<String>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

/// Input to [`crate::store::ClientStore::create_client`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewClient {
  pub company_name:   String,
  pub contact_person: Option<String>,
  pub email:          Option<String>,
  pub phone:          Option<String>,
  pub address:        Option<String>,
  pub city:           Option<String>,
  pub province:       Option<String>,
  pub industry:       Option<String>,
  #[serde(default)]
  pub status:         ClientStatus,
  pub notes:          Option<String>,
}

impl NewClient {
  pub fn new(company_name: impl Into<String>) -> Self {
    Self { company_name: company_name.into(), ..Self::default() }
  }
}

impl Validate for NewClient {
  fn validate(&self) -> Result<()> {
    validate::required("company_name", &self.company_name)?;
    validate::email("email", self.email.as_deref())
  }
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientUpdate {
  pub company_name:   Option<String>,
  pub contact_person: Option<String>,
  pub email:          Option<String>,
  pub phone:          Option<String>,
  pub address:        Option<String>,
  pub city:           Option<String>,
  pub province:       Option<String>,
  pub industry:       Option<String>,
  pub status:         Option<ClientStatus>,
  pub notes:          Option<String>,
}

impl Validate for ClientUpdate {
  fn validate(&self) -> Result<()> {
    validate::not_blank("company_name", self.company_name.as_deref())?;
    validate::email("email", self.email.as_deref())
  }
}
