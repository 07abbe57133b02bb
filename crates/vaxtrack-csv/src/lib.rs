//! CSV codec for vaxtrack.
//!
//! Reads student roster uploads into validated [`ImportRow`]s and writes the
//! ledger report. Pure synchronous; no HTTP or database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! let upload = "studentId,name,grade,dateOfBirth\nST001,Asha Rao,5,21-07-2014\n";
//! let rows = vaxtrack_csv::parse_students(upload).unwrap();
//! assert_eq!(rows[0].student.student_id, "ST001");
//! ```

pub mod error;
mod parse;
mod serialize;

pub use error::{Error, Result};
pub use parse::{STUDENT_HEADERS, parse_dmy};
use vaxtrack_core::{import::ImportRow, report::ReportRow};

/// Parse and validate a student roster.
///
/// Validation is all-or-nothing: any bad row rejects the whole upload with
/// [`vaxtrack_core::Error::ValidationErrors`] listing every problem found.
/// Missing required columns are reported as
/// [`vaxtrack_core::Error::InvalidHeaders`] before any row is read, and an
/// upload with no data rows as [`vaxtrack_core::Error::EmptyBatch`].
pub fn parse_students(input: &str) -> Result<Vec<ImportRow>> {
  parse::parse_students(input)
}

/// Render report rows as CSV with a header line.
pub fn write_report(rows: &[ReportRow]) -> Result<String> {
  serialize::write_report(rows)
}
