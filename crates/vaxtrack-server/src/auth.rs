//! Bearer-token auth middleware and standalone verifier.

use std::sync::Arc;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use rand_core::{OsRng, RngCore};
use vaxtrack_api::Principal;

use crate::error::Error;

/// Length of generated tokens before encoding.
const TOKEN_BYTES: usize = 32;

/// The one credential this server instance accepts.
#[derive(Clone)]
pub struct AuthConfig {
  /// Name logged against every write made with the token.
  pub principal:  String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub token_hash: String,
}

/// Check the `Authorization: Bearer <token>` header against `config`.
pub fn verify_bearer(headers: &HeaderMap, config: &AuthConfig) -> Result<Principal, Error> {
  let token = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or(Error::Unauthorized)?;

  let parsed_hash =
    PasswordHash::new(&config.token_hash).map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(token.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(Principal(config.principal.clone()))
}

/// Middleware guarding the API. On success the caller's [`Principal`] is
/// attached to the request for handlers to log.
pub async fn require_bearer(
  State(config): State<Arc<AuthConfig>>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error> {
  let principal = match verify_bearer(req.headers(), &config) {
    Ok(p) => p,
    Err(e) => {
      tracing::warn!(path = %req.uri().path(), "rejected unauthenticated request");
      return Err(e);
    }
  };
  req.extensions_mut().insert(principal);
  Ok(next.run(req).await)
}

/// A fresh random token, URL-safe base64.
pub fn generate_token() -> String {
  let mut bytes = [0u8; TOKEN_BYTES];
  OsRng.fill_bytes(&mut bytes);
  B64.encode(bytes)
}

/// The argon2 PHC string to put in `auth_token_hash`.
pub fn hash_token(token: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(token.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| Error::Hash(e.to_string()))
}
