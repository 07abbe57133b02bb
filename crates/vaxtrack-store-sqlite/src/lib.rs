//! SQLite backend for the vaxtrack record keeper.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on one dedicated
//! thread without blocking the async runtime. Because every call goes through
//! that single connection, store operations are serialised; the recorder
//! additionally takes an IMMEDIATE transaction so the dose check holds even
//! when another process opens the same file.

mod encode;
mod queries;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
