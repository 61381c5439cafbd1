//! The JSON envelope every endpoint responds with, and the extractors that
//! keep request errors inside it.

use axum::{
  Json,
  extract::{FromRequest, FromRequestParts},
  http::{StatusCode, request::Parts},
  response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::ApiError;

/// `{ success, data?, error?, message? }`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data:    Option<T>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error:   Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

impl<T> Envelope<T> {
  pub fn failure(error: impl Into<String>) -> Self {
    Self { success: false, data: None, error: Some(error.into()), message: None }
  }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
  fn into_response(self) -> Response { Json(self).into_response() }
}

/// A successful response: status code, payload and an optional message.
#[derive(Debug)]
pub struct Success<T> {
  status:  StatusCode,
  data:    T,
  message: Option<String>,
}

impl<T> Success<T> {
  pub fn ok(data: T) -> Self { Self { status: StatusCode::OK, data, message: None } }

  pub fn created(data: T) -> Self { Self { status: StatusCode::CREATED, data, message: None } }

  pub fn with_message(mut self, message: impl Into<String>) -> Self {
    self.message = Some(message.into());
    self
  }
}

impl<T: Serialize> IntoResponse for Success<T> {
  fn into_response(self) -> Response {
    let body = Envelope { success: true, data: Some(self.data), error: None, message: self.message };
    (self.status, body).into_response()
  }
}

/// `GET` on a collection answers with one record when `?id` is given.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
  One(T),
  Many(Vec<T>),
}

/// [`axum::Json`] with its rejection rendered as a 400 envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// [`axum::extract::Query`] with its rejection rendered as a 400 envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

/// The caller's identity for the audit log, from the `X-Actor` header.
#[derive(Debug, Clone, Default)]
pub struct Actor(pub Option<String>);

pub const ACTOR_HEADER: &str = "x-actor";

impl<S: Send + Sync> FromRequestParts<S> for Actor {
  type Rejection = std::convert::Infallible;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let actor = parts
      .headers
      .get(ACTOR_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|v| !v.is_empty())
      .map(str::to_owned);
    Ok(Actor(actor))
  }
}
