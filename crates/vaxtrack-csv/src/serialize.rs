//! Report rendering.

use csv::Writer;
use vaxtrack_core::report::{REPORT_HEADERS, ReportRow};

use crate::{Error, Result};

pub fn write_report(rows: &[ReportRow]) -> Result<String> {
  let mut writer = Writer::from_writer(Vec::new());
  writer.write_record(REPORT_HEADERS)?;
  for row in rows {
    writer.write_record(row.cells())?;
  }
  let bytes = writer.into_inner().map_err(|e| Error::Flush(e.to_string()))?;
  Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  #[test]
  fn report_has_header_and_quotes_commas() {
    let row = ReportRow {
      student_id:       "ST001".into(),
      student_name:     "Kumar, Naveen".into(),
      grade:            "10".into(),
      section:          None,
      vaccine_name:     "MMR".into(),
      vaccination_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
      drive_name:       "Spring round".into(),
      drive_date:       NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
      administered_by:  "School Coordinator".into(),
    };
    let out = write_report(&[row]).unwrap();
    let mut lines = out.lines();
    assert_eq!(
      lines.next(),
      Some(
        "studentId,studentName,grade,section,vaccineName,vaccinationDate,\
         driveName,driveDate,administeredBy"
      )
    );
    assert_eq!(
      lines.next(),
      Some(
        "ST001,\"Kumar, Naveen\",10,,MMR,2025-03-10,Spring round,2025-03-10,\
         School Coordinator"
      )
    );
  }

  #[test]
  fn empty_report_is_just_the_header() {
    let out = write_report(&[]).unwrap();
    assert_eq!(out.lines().count(), 1);
  }
}
