//! Roster parsing and per-row validation.
//!
//! Header names are matched loosely (`studentId`, `student_id` and
//! `Student ID` name the same column); cell values are matched strictly.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use vaxtrack_core::{
  Error as CoreError,
  import::{ImportRow, RowError},
  student::{Gender, NewStudent},
};

use crate::Result;

/// Canonical roster columns, in template order.
pub const STUDENT_HEADERS: [&str; 9] = [
  "studentId",
  "name",
  "dateOfBirth",
  "gender",
  "grade",
  "section",
  "parentName",
  "contactNumber",
  "address",
];

const REQUIRED: [&str; 3] = ["studentId", "name", "grade"];

// ─── Headers ─────────────────────────────────────────────────────────────────

fn normalize_header(h: &str) -> String {
  h.chars()
    .filter(|c| !matches!(c, '_' | '-' | ' ' | '\u{feff}'))
    .flat_map(char::to_lowercase)
    .collect()
}

/// Position of each known column in the upload.
#[derive(Debug, Default)]
struct Columns {
  positions: [Option<usize>; STUDENT_HEADERS.len()],
  width:     usize,
}

impl Columns {
  fn locate(headers: &StringRecord) -> Result<Self> {
    let mut cols = Self { width: headers.len(), ..Default::default() };
    for (pos, header) in headers.iter().enumerate() {
      let key = normalize_header(header);
      if let Some(idx) = STUDENT_HEADERS
        .iter()
        .position(|known| normalize_header(known) == key)
      {
        // First occurrence wins.
        cols.positions[idx].get_or_insert(pos);
      }
    }

    let missing: Vec<String> = REQUIRED
      .iter()
      .filter(|name| cols.index(name).is_none())
      .map(|name| (*name).to_owned())
      .collect();
    if !missing.is_empty() {
      return Err(CoreError::InvalidHeaders { missing }.into());
    }
    Ok(cols)
  }

  fn index(&self, name: &str) -> Option<usize> {
    let idx = STUDENT_HEADERS.iter().position(|h| *h == name)?;
    self.positions[idx]
  }

  /// The trimmed cell for `name`, or `None` when absent or empty.
  fn cell<'r>(&self, record: &'r StringRecord, name: &str) -> Option<&'r str> {
    self
      .index(name)
      .and_then(|pos| record.get(pos))
      .filter(|v| !v.is_empty())
  }
}

// ─── Cell parsers ────────────────────────────────────────────────────────────

fn days_in_month(year: i32, month: u32) -> u32 {
  match month {
    2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
    2 => 28,
    4 | 6 | 9 | 11 => 30,
    _ => 31,
  }
}

fn digits(part: &str, min: usize, max: usize) -> Option<u32> {
  let ok = (min..=max).contains(&part.len()) && part.bytes().all(|b| b.is_ascii_digit());
  ok.then(|| part.parse().ok()).flatten()
}

/// Parse a strict `DD-MM-YYYY` date. Day and month may be one or two digits.
///
/// The error string explains what is wrong with the value.
pub fn parse_dmy(value: &str) -> Result<NaiveDate, String> {
  let format_err = || format!("date {value:?} must be in DD-MM-YYYY format");
  let parts: Vec<&str> = value.split('-').collect();
  let [d, m, y] = parts.as_slice() else {
    return Err(format_err());
  };
  let (Some(day), Some(month), Some(year)) =
    (digits(d, 1, 2), digits(m, 1, 2), digits(y, 4, 4))
  else {
    return Err(format_err());
  };
  if !(1..=12).contains(&month) {
    return Err(format!("date {value:?} has no month {month}"));
  }
  let year = year as i32;
  let last = days_in_month(year, month);
  if day == 0 || day > last {
    return Err(format!(
      "date {value:?} is not a real date: month {month} of {year} has {last} days"
    ));
  }
  NaiveDate::from_ymd_opt(year, month, day).ok_or_else(format_err)
}

fn parse_gender(value: &str) -> Result<Gender, String> {
  value
    .parse()
    .map_err(|_| format!("gender {value:?} must be Male, Female or Other"))
}

// ─── Rows ────────────────────────────────────────────────────────────────────

fn parse_row(
  cols: &Columns,
  record: &StringRecord,
) -> Result<NewStudent, Vec<String>> {
  let mut problems = vec![];

  if record.len() > cols.width {
    problems.push(format!(
      "has {} cells but the header has {} columns",
      record.len(),
      cols.width
    ));
  }
  for name in REQUIRED {
    if cols.cell(record, name).is_none() {
      problems.push(format!("{name} is required"));
    }
  }

  let date_of_birth = match cols.cell(record, "dateOfBirth").map(parse_dmy) {
    Some(Ok(d)) => Some(d),
    Some(Err(e)) => {
      problems.push(format!("dateOfBirth: {e}"));
      None
    }
    None => None,
  };
  let gender = match cols.cell(record, "gender").map(parse_gender) {
    Some(Ok(g)) => Some(g),
    Some(Err(e)) => {
      problems.push(e);
      None
    }
    None => None,
  };

  if !problems.is_empty() {
    return Err(problems);
  }

  let text = |name: &str| cols.cell(record, name).map(str::to_owned);
  Ok(NewStudent {
    student_id: text("studentId").unwrap_or_default(),
    name: text("name").unwrap_or_default(),
    date_of_birth,
    gender,
    grade: text("grade").unwrap_or_default(),
    section: text("section"),
    parent_name: text("parentName"),
    contact_number: text("contactNumber"),
    address: text("address"),
  })
}

pub fn parse_students(input: &str) -> Result<Vec<ImportRow>> {
  let input = input.strip_prefix('\u{feff}').unwrap_or(input);
  let mut reader = ReaderBuilder::new()
    .has_headers(true)
    .flexible(true)
    .trim(Trim::All)
    .from_reader(input.as_bytes());

  let cols = Columns::locate(reader.headers()?)?;

  let mut rows = vec![];
  let mut errors = vec![];
  for (i, record) in reader.records().enumerate() {
    let row = i + 1;
    let record = match record {
      Ok(r) => r,
      Err(e) => {
        errors.push(RowError { row, student_id: None, message: e.to_string() });
        continue;
      }
    };
    match parse_row(&cols, &record) {
      Ok(student) => rows.push(ImportRow { row, student }),
      Err(problems) => {
        let student_id = cols.cell(&record, "studentId").map(str::to_owned);
        errors.extend(problems.into_iter().map(|message| RowError {
          row,
          student_id: student_id.clone(),
          message,
        }));
      }
    }
  }

  if !errors.is_empty() {
    return Err(CoreError::ValidationErrors(errors).into());
  }
  if rows.is_empty() {
    return Err(CoreError::EmptyBatch.into());
  }
  Ok(rows)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Error;

  fn rejection(input: &str) -> CoreError {
    match parse_students(input) {
      Err(Error::Rejected(e)) => e,
      other => panic!("expected a rejection, got {other:?}"),
    }
  }

  fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn dmy_dates() {
    assert_eq!(parse_dmy("21-07-1998"), Ok(day(1998, 7, 21)));
    assert_eq!(parse_dmy("1-2-2010"), Ok(day(2010, 2, 1)));
    assert_eq!(parse_dmy("29-02-2024"), Ok(day(2024, 2, 29)));
    assert!(parse_dmy("29-02-2023").is_err());
    assert!(parse_dmy("31-02-2020").unwrap_err().contains("29 days"));
    assert!(parse_dmy("31-04-2020").is_err());
    assert!(parse_dmy("00-01-2020").is_err());
    assert!(parse_dmy("12-13-2020").is_err());
  }

  #[test]
  fn dmy_rejects_other_layouts() {
    for bad in ["1998-07-21", "21/07/1998", "21-07-98", "021-07-1998", "a-b-cdef", ""] {
      assert!(parse_dmy(bad).is_err(), "{bad} should be rejected");
    }
  }

  #[test]
  fn parses_full_roster() {
    let input = "studentId,name,dateOfBirth,gender,grade,section,parentName,contactNumber,address\n\
                 ST001, Naveen Kumar ,21-07-1998,male,10,B,Ravi,9876567809,\"12 Main St, Pune\"\n";
    let rows = parse_students(input).unwrap();
    assert_eq!(rows.len(), 1);
    let s = &rows[0].student;
    assert_eq!(rows[0].row, 1);
    assert_eq!(s.name, "Naveen Kumar");
    assert_eq!(s.date_of_birth, Some(day(1998, 7, 21)));
    assert_eq!(s.gender, Some(Gender::Male));
    assert_eq!(s.address.as_deref(), Some("12 Main St, Pune"));
  }

  #[test]
  fn headers_match_loosely_and_ignore_bom_and_unknowns() {
    let input = "\u{feff}Student ID,NAME,grade,favourite_colour\nA1,Asha,5,blue\n";
    let rows = parse_students(input).unwrap();
    assert_eq!(rows[0].student.student_id, "A1");
    assert!(rows[0].student.section.is_none());
  }

  #[test]
  fn missing_required_header() {
    let err = rejection("studentId,name\nA1,Asha\n");
    assert!(matches!(err, CoreError::InvalidHeaders { missing } if missing == vec!["grade"]));
  }

  #[test]
  fn header_only_is_empty_batch() {
    assert!(matches!(rejection("studentId,name,grade\n\n"), CoreError::EmptyBatch));
  }

  #[test]
  fn collects_errors_from_every_row() {
    let input = "studentId,name,grade,dateOfBirth,gender\n\
                 A1,Asha,5,31-02-2020,Female\n\
                 A2,,6,,\n\
                 A3,Ravi,7,,unknown\n\
                 A4,Meena,8,,\n\
                 A5,Extra,8,,,surplus\n";
    let CoreError::ValidationErrors(errors) = rejection(input) else {
      panic!("expected ValidationErrors")
    };
    let rows: Vec<usize> = errors.iter().map(|e| e.row).collect();
    assert_eq!(rows, vec![1, 2, 3, 5]);
    assert_eq!(errors[1].student_id.as_deref(), Some("A2"));
    assert!(errors[1].message.contains("name is required"));
  }

  #[test]
  fn blank_lines_are_skipped() {
    let input = "studentId,name,grade\nA1,Asha,5\n\nA2,Ravi,6\n";
    let rows = parse_students(input).unwrap();
    assert_eq!(rows.iter().map(|r| r.row).collect::<Vec<_>>(), vec![1, 2]);
  }
}
