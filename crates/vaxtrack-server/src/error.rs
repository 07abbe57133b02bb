//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
  #[error("could not hash token: {0}")]
  Hash(String),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => {
        let body = json!({
          "error": "unauthorized",
          "message": "a valid bearer token is required",
        });
        let mut res = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Bearer realm=\"vaxtrack\""),
        );
        res
      }
      Error::Hash(msg) => {
        tracing::error!(%msg, "token hashing failed");
        (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response()
      }
    }
  }
}
