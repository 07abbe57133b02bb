//! Error types for the vaxtrack-csv codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The upload was read but its content breaks an import rule.
  #[error(transparent)]
  Rejected(#[from] vaxtrack_core::Error),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("csv output is not valid utf-8: {0}")]
  Utf8(#[from] std::string::FromUtf8Error),

  #[error("could not flush csv writer: {0}")]
  Flush(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
