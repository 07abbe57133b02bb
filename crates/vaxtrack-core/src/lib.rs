//! Core types, rules and trait definitions for the vaxtrack record keeper.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! scheduling, eligibility and dose-accounting rules live here as pure
//! functions so that every storage backend enforces them the same way.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod dashboard;
pub mod drive;
pub mod eligibility;
pub mod error;
pub mod import;
pub mod ledger;
pub mod report;
pub mod store;
pub mod student;

pub use error::{Error, Result};
