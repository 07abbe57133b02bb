//! The flattened ledger report.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Column order of the CSV rendering.
pub const REPORT_HEADERS: [&str; 9] = [
  "studentId",
  "studentName",
  "grade",
  "section",
  "vaccineName",
  "vaccinationDate",
  "driveName",
  "driveDate",
  "administeredBy",
];

/// One vaccination, joined with its student and drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
  pub student_id:       String,
  pub student_name:     String,
  /// The student's current grade.
  pub grade:            String,
  pub section:          Option<String>,
  pub vaccine_name:     String,
  pub vaccination_date: NaiveDate,
  pub drive_name:       String,
  pub drive_date:       NaiveDate,
  pub administered_by:  String,
}

impl ReportRow {
  /// Cells in [`REPORT_HEADERS`] order.
  pub fn cells(&self) -> [String; 9] {
    [
      self.student_id.clone(),
      self.student_name.clone(),
      self.grade.clone(),
      self.section.clone().unwrap_or_default(),
      self.vaccine_name.clone(),
      self.vaccination_date.to_string(),
      self.drive_name.clone(),
      self.drive_date.to_string(),
      self.administered_by.clone(),
    ]
  }
}

/// Parameters for [`crate::store::VaccinationStore::report`]. Date bounds
/// apply to the drive date and are inclusive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
  pub drive_id:     Option<Uuid>,
  pub vaccine_name: Option<String>,
  pub start_date:   Option<NaiveDate>,
  pub end_date:     Option<NaiveDate>,
  pub grade:        Option<String>,
  pub limit:        Option<usize>,
  pub offset:       Option<usize>,
}

/// A page of report rows and the total number of matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPage {
  pub total: u32,
  pub rows:  Vec<ReportRow>,
}
