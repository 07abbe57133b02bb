//! HTTP server for vaxtrack.
//!
//! Mounts [`vaxtrack_api::api_router`] under `/api` behind bearer-token auth
//! and adds an unauthenticated `/health` check.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Json, Router, middleware, routing::get};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use vaxtrack_core::{clock::Clock, store::VaccinationStore};

use auth::{AuthConfig, require_bearer};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `VAXTRACK_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  pub store_path:      PathBuf,
  #[serde(default = "default_principal")]
  pub auth_principal:  String,
  pub auth_token_hash: String,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }
fn default_principal() -> String { "coordinator".to_string() }

impl ServerConfig {
  pub fn auth(&self) -> AuthConfig {
    AuthConfig {
      principal:  self.auth_principal.clone(),
      token_hash: self.auth_token_hash.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S>(store: Arc<S>, clock: Arc<dyn Clock>, auth: AuthConfig) -> Router
where
  S: VaccinationStore + 'static,
{
  let api = vaxtrack_api::api_router(store, clock)
    .layer(middleware::from_fn_with_state(Arc::new(auth), require_bearer));

  Router::new()
    .route("/health", get(health))
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

// ─── Integration tests ────────────────────────────────────────────────────────
