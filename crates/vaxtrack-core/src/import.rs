//! Bulk student import: the commit half.
//!
//! Parsing and per-row validation live in `vaxtrack-csv`; it hands over
//! [`ImportRow`]s only once every row is valid. Committing inserts rows one
//! at a time so one storage failure does not sink the rest.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  store::{StoreError, VaccinationStore},
  student::NewStudent,
};

/// A validated row, numbered from 1 in data-row order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
  pub row:     usize,
  pub student: NewStudent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
  pub row:        usize,
  pub student_id: Option<String>,
  pub message:    String,
}

impl fmt::Display for RowError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "row {}: {}", self.row, self.message)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
  pub imported: usize,
  pub failed:   Vec<RowError>,
}

/// Insert every row. Returns the summary on full success and
/// [`Error::PartialImportFailure`] if any row was refused by the store.
pub async fn commit<S: VaccinationStore>(
  store: &S,
  rows: Vec<ImportRow>,
) -> Result<ImportReport> {
  if rows.is_empty() {
    return Err(Error::EmptyBatch);
  }
  let mut report = ImportReport::default();
  for ImportRow { row, student } in rows {
    let student_id = student.student_id.trim().to_owned();
    match store.add_student(student).await {
      Ok(_) => report.imported += 1,
      Err(e) => {
        let message = match e.into_domain() {
          Ok(rule) => rule.to_string(),
          Err(other) => other.to_string(),
        };
        report.failed.push(RowError {
          row,
          student_id: Some(student_id),
          message,
        });
      }
    }
  }
  if report.failed.is_empty() {
    Ok(report)
  } else {
    Err(Error::PartialImportFailure(report))
  }
}
