//! JSON REST API for vaxtrack.
//!
//! Exposes an axum [`Router`] backed by any
//! [`vaxtrack_core::store::VaccinationStore`]. Authentication, TLS and
//! transport concerns are the caller's responsibility; an upstream layer may
//! attach a [`Principal`] to each request for audit logging.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", vaxtrack_api::api_router(store.clone(), Arc::new(SystemClock)))
//! ```

pub mod dashboard;
pub mod drives;
pub mod error;
pub mod principal;
pub mod reports;
pub mod students;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use vaxtrack_core::{clock::Clock, store::VaccinationStore};

pub use error::ApiError;
pub use principal::Principal;

/// Shared state handed to every handler.
pub struct ApiState<S> {
  pub store: Arc<S>,
  pub clock: Arc<dyn Clock>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), clock: self.clock.clone() }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, clock: Arc<dyn Clock>) -> Router<()>
where
  S: VaccinationStore + 'static,
{
  Router::new()
    // Drives
    .route("/drives", get(drives::list::<S>).post(drives::create::<S>))
    .route(
      "/drives/{id}",
      get(drives::get_one::<S>)
        .put(drives::update::<S>)
        .delete(drives::remove::<S>),
    )
    .route("/drives/{id}/cancel", post(drives::cancel::<S>))
    .route("/drives/{id}/eligible", get(drives::eligible::<S>))
    .route("/drives/{id}/vaccinate", post(drives::vaccinate::<S>))
    // Students
    .route("/students", get(students::list::<S>).post(students::create::<S>))
    .route("/students/bulk-import", post(students::bulk_import::<S>))
    .route(
      "/students/{id}",
      get(students::get_one::<S>)
        .put(students::update::<S>)
        .delete(students::remove::<S>),
    )
    // Dashboard
    .route("/dashboard/stats", get(dashboard::stats::<S>))
    .route("/dashboard/recent-drives", get(dashboard::recent::<S>))
    .route("/dashboard/upcoming-drives", get(dashboard::upcoming::<S>))
    // Reports
    .route("/reports", get(reports::handler::<S>))
    .with_state(ApiState { store, clock })
}

#[cfg(test)]
mod tests;
