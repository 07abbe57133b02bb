//! The authenticated caller, as seen by handlers.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

/// Name of whoever made the request. Inserted into request extensions by
/// the server's auth layer; `anonymous` when the API is mounted without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(pub String);

impl Principal {
  pub fn anonymous() -> Self { Self("anonymous".to_owned()) }
}

impl std::fmt::Display for Principal {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

impl<S: Send + Sync> FromRequestParts<S> for Principal {
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    Ok(
      parts
        .extensions
        .get::<Principal>()
        .cloned()
        .unwrap_or_else(Principal::anonymous),
    )
  }
}
