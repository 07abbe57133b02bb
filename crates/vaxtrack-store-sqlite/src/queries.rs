//! Synchronous statements run on the connection thread.
//!
//! Every function takes a plain `&Connection` so it can be called either
//! directly or through a `Transaction` (which derefs to one).

use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use rusqlite::{Connection, OptionalExtension as _, params, params_from_iter, types::Value};
use uuid::Uuid;
use vaxtrack_core::{
  Error as CoreError,
  dashboard::{DashboardStats, RECENT_DRIVES, VaccineCount, coverage_percentage},
  drive::{Drive, DriveQuery, DriveStatus, DriveSummary, UPCOMING_WINDOW_DAYS},
  ledger::{DriveDetail, LedgerEntry, Vaccination},
  report::{ReportQuery, ReportRow},
  student::{Student, StudentQuery, StudentVaccination, VaccinationStatus},
};

use crate::{
  Result,
  encode::{
    DRIVE_COLUMNS, RawDrive, RawDriveSummary, RawReportRow, RawStudent,
    RawVaccination, STUDENT_COLUMNS, VACCINATED_COUNT, VACCINATION_COLUMNS,
    decode_date, decode_uuid, encode_date, encode_dt, encode_grades,
    encode_uuid,
  },
};

/// `true` for a UNIQUE or PRIMARY KEY constraint failure.
pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        || f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
  )
}

/// `%term%` for a `LIKE ... ESCAPE '\'` clause, with the term's own
/// wildcards taken literally.
pub fn like_substring(term: &str) -> String {
  let mut out = String::with_capacity(term.len() + 2);
  out.push('%');
  for c in term.chars() {
    if matches!(c, '\\' | '%' | '_') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

fn window_end(today: NaiveDate) -> NaiveDate {
  today
    .checked_add_days(Days::new(UPCOMING_WINDOW_DAYS))
    .unwrap_or(NaiveDate::MAX)
}

// ─── Students ────────────────────────────────────────────────────────────────

pub fn insert_student(conn: &Connection, s: &Student) -> Result<()> {
  let res = conn.execute(
    "INSERT INTO students (
       id, student_id, name, date_of_birth, gender, grade,
       section, parent_name, contact_number, address, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    params![
      encode_uuid(s.id),
      s.student_id,
      s.name,
      s.date_of_birth.map(encode_date),
      s.gender.map(|g| g.as_ref().to_owned()),
      s.grade,
      s.section,
      s.parent_name,
      s.contact_number,
      s.address,
      encode_dt(s.created_at),
    ],
  );
  match res {
    Ok(_) => Ok(()),
    Err(e) if is_unique_violation(&e) => {
      Err(CoreError::DuplicateStudentId(s.student_id.clone()).into())
    }
    Err(e) => Err(e.into()),
  }
}

pub fn update_student(conn: &Connection, s: &Student) -> Result<()> {
  let res = conn.execute(
    "UPDATE students SET
       student_id = ?2, name = ?3, date_of_birth = ?4, gender = ?5,
       grade = ?6, section = ?7, parent_name = ?8, contact_number = ?9,
       address = ?10
     WHERE id = ?1",
    params![
      encode_uuid(s.id),
      s.student_id,
      s.name,
      s.date_of_birth.map(encode_date),
      s.gender.map(|g| g.as_ref().to_owned()),
      s.grade,
      s.section,
      s.parent_name,
      s.contact_number,
      s.address,
    ],
  );
  match res {
    Ok(_) => Ok(()),
    Err(e) if is_unique_violation(&e) => {
      Err(CoreError::DuplicateStudentId(s.student_id.clone()).into())
    }
    Err(e) => Err(e.into()),
  }
}

pub fn delete_student(conn: &Connection, id: Uuid) -> Result<()> {
  conn.execute("DELETE FROM students WHERE id = ?1", params![encode_uuid(id)])?;
  Ok(())
}

pub fn fetch_student(conn: &Connection, id: Uuid) -> Result<Option<Student>> {
  conn
    .query_row(
      &format!("SELECT {STUDENT_COLUMNS} FROM students s WHERE s.id = ?1"),
      params![encode_uuid(id)],
      |row| RawStudent::read(row, 0),
    )
    .optional()?
    .map(RawStudent::into_student)
    .transpose()
}

/// The students among `ids` that exist, in request order.
pub fn students_by_ids(conn: &Connection, ids: &[Uuid]) -> Result<Vec<Student>> {
  let mut out = Vec::with_capacity(ids.len());
  for id in ids {
    if let Some(s) = fetch_student(conn, *id)? {
      out.push(s);
    }
  }
  Ok(out)
}

pub fn all_students(conn: &Connection) -> Result<Vec<Student>> {
  search_students(conn, &StudentQuery::default())
}

pub fn search_students(conn: &Connection, q: &StudentQuery) -> Result<Vec<Student>> {
  let mut conds: Vec<String> = vec![];
  let mut args: Vec<Value> = vec![];

  if let Some(name) = q.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
    args.push(Value::Text(like_substring(name)));
    conds.push(format!("s.name LIKE ?{} ESCAPE '\\'", args.len()));
  }
  if let Some(sid) = q.student_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
    args.push(Value::Text(like_substring(sid)));
    conds.push(format!("s.student_id LIKE ?{} ESCAPE '\\'", args.len()));
  }
  if !q.grades.is_empty() {
    let mut slots = Vec::with_capacity(q.grades.len());
    for g in &q.grades {
      args.push(Value::Text(g.trim().to_owned()));
      slots.push(format!("?{}", args.len()));
    }
    conds.push(format!("s.grade IN ({})", slots.join(", ")));
  }
  if let Some(status) = q.vaccination_status {
    let drive_clause = match q.drive_id {
      Some(drive_id) => {
        args.push(Value::Text(encode_uuid(drive_id)));
        format!(" AND v.drive_id = ?{}", args.len())
      }
      None => String::new(),
    };
    let exists = format!(
      "EXISTS (SELECT 1 FROM vaccinations v WHERE v.student = s.id{drive_clause})"
    );
    conds.push(match status {
      VaccinationStatus::Vaccinated => exists,
      VaccinationStatus::NotVaccinated => format!("NOT {exists}"),
    });
  }

  let where_clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  let sql = format!(
    "SELECT {STUDENT_COLUMNS} FROM students s {where_clause}
     ORDER BY s.student_id, s.id"
  );

  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params_from_iter(args), |row| RawStudent::read(row, 0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawStudent::into_student).collect()
}

/// A student's vaccinations with the drive each came from, newest first.
pub fn student_vaccinations(
  conn: &Connection,
  id: Uuid,
) -> Result<Vec<StudentVaccination>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {VACCINATION_COLUMNS}, d.name, d.vaccine_name, d.date
     FROM vaccinations v
     JOIN drives d ON d.id = v.drive_id
     WHERE v.student = ?1
     ORDER BY v.date DESC, d.date DESC"
  ))?;
  let w = RawVaccination::WIDTH;
  let raws = stmt
    .query_map(params![encode_uuid(id)], |row| {
      Ok((
        RawVaccination::read(row, 0)?,
        row.get::<_, String>(w)?,
        row.get::<_, String>(w + 1)?,
        row.get::<_, String>(w + 2)?,
      ))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raws
    .into_iter()
    .map(|(raw, drive_name, vaccine_name, drive_date)| {
      Ok(StudentVaccination {
        vaccination: raw.into_vaccination()?,
        drive_name,
        vaccine_name,
        drive_date: decode_date(&drive_date)?,
      })
    })
    .collect()
}

pub fn student_ledger_count(conn: &Connection, id: Uuid) -> Result<u32> {
  Ok(conn.query_row(
    "SELECT COUNT(*) FROM vaccinations WHERE student = ?1",
    params![encode_uuid(id)],
    |r| r.get(0),
  )?)
}

// ─── Drives ──────────────────────────────────────────────────────────────────

fn map_drive_write(res: rusqlite::Result<usize>, d: &Drive) -> Result<()> {
  match res {
    Ok(_) => Ok(()),
    Err(e) if is_unique_violation(&e) => Err(CoreError::DateConflict(d.date).into()),
    Err(e) => Err(e.into()),
  }
}

pub fn insert_drive(conn: &Connection, d: &Drive) -> Result<()> {
  let res = conn.execute(
    "INSERT INTO drives (
       id, name, vaccine_name, date, total_doses, available_doses,
       applicable_grades, status, description, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    params![
      encode_uuid(d.id),
      d.name,
      d.vaccine_name,
      encode_date(d.date),
      d.total_doses,
      d.available_doses,
      encode_grades(&d.applicable_grades)?,
      d.status.as_ref(),
      d.description,
      encode_dt(d.created_at),
    ],
  );
  map_drive_write(res, d)
}

/// Overwrite every mutable column of an existing drive.
pub fn update_drive(conn: &Connection, d: &Drive) -> Result<()> {
  let res = conn.execute(
    "UPDATE drives SET
       name = ?2, vaccine_name = ?3, date = ?4, total_doses = ?5,
       available_doses = ?6, applicable_grades = ?7, status = ?8,
       description = ?9
     WHERE id = ?1",
    params![
      encode_uuid(d.id),
      d.name,
      d.vaccine_name,
      encode_date(d.date),
      d.total_doses,
      d.available_doses,
      encode_grades(&d.applicable_grades)?,
      d.status.as_ref(),
      d.description,
    ],
  );
  map_drive_write(res, d)
}

pub fn delete_drive(conn: &Connection, id: Uuid) -> Result<()> {
  conn.execute("DELETE FROM drives WHERE id = ?1", params![encode_uuid(id)])?;
  Ok(())
}

pub fn fetch_drive(conn: &Connection, id: Uuid) -> Result<Option<Drive>> {
  conn
    .query_row(
      &format!("SELECT {DRIVE_COLUMNS} FROM drives d WHERE d.id = ?1"),
      params![encode_uuid(id)],
      |row| RawDrive::read(row, 0),
    )
    .optional()?
    .map(RawDrive::into_drive)
    .transpose()
}

/// Whether a live (non-cancelled) drive other than `except` sits on `date`.
pub fn date_taken(conn: &Connection, date: NaiveDate, except: Option<Uuid>) -> Result<bool> {
  let except = except.map(encode_uuid).unwrap_or_default();
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM drives
         WHERE date = ?1 AND status != 'cancelled' AND id != ?2
         LIMIT 1",
        params![encode_date(date), except],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

fn select_summaries(
  conn: &Connection,
  conds: &[String],
  args: Vec<Value>,
  order: &str,
  limit: Option<usize>,
) -> Result<Vec<DriveSummary>> {
  let where_clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  let limit_clause = limit.map(|n| format!("LIMIT {n}")).unwrap_or_default();
  let sql = format!(
    "SELECT {DRIVE_COLUMNS}, {VACCINATED_COUNT} FROM drives d
     {where_clause} ORDER BY {order} {limit_clause}"
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params_from_iter(args), RawDriveSummary::read)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawDriveSummary::into_summary).collect()
}

pub fn search_drives(
  conn: &Connection,
  q: &DriveQuery,
  today: NaiveDate,
) -> Result<Vec<DriveSummary>> {
  let mut conds: Vec<String> = vec![];
  let mut args: Vec<Value> = vec![];

  if let Some(status) = q.status {
    args.push(Value::Text(status.as_ref().to_owned()));
    conds.push(format!("d.status = ?{}", args.len()));
  }
  if q.upcoming {
    args.push(Value::Text(DriveStatus::Scheduled.as_ref().to_owned()));
    conds.push(format!("d.status = ?{}", args.len()));
    args.push(Value::Text(encode_date(today)));
    args.push(Value::Text(encode_date(window_end(today))));
    conds.push(format!(
      "d.date BETWEEN ?{} AND ?{}",
      args.len() - 1,
      args.len()
    ));
  }
  if q.past {
    args.push(Value::Text(encode_date(today)));
    conds.push(format!("d.date < ?{}", args.len()));
  }

  select_summaries(conn, &conds, args, "d.date ASC, d.created_at ASC", None)
}

/// Drives dated on or before `today`, newest first.
pub fn recent_drives(
  conn: &Connection,
  today: NaiveDate,
  limit: usize,
) -> Result<Vec<DriveSummary>> {
  select_summaries(
    conn,
    &["d.date <= ?1".to_owned()],
    vec![Value::Text(encode_date(today))],
    "d.date DESC, d.created_at DESC",
    Some(limit),
  )
}

/// Scheduled drives dated after `today`, soonest first.
pub fn upcoming_drives(
  conn: &Connection,
  today: NaiveDate,
  limit: usize,
) -> Result<Vec<DriveSummary>> {
  select_summaries(
    conn,
    &["d.status = 'scheduled'".to_owned(), "d.date > ?1".to_owned()],
    vec![Value::Text(encode_date(today))],
    "d.date ASC",
    Some(limit),
  )
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

pub fn ledger_count(conn: &Connection, drive_id: Uuid) -> Result<u32> {
  Ok(conn.query_row(
    "SELECT COUNT(*) FROM vaccinations WHERE drive_id = ?1",
    params![encode_uuid(drive_id)],
    |r| r.get(0),
  )?)
}

/// Record ids of every student already in the drive's ledger.
pub fn vaccinated_set(conn: &Connection, drive_id: Uuid) -> Result<HashSet<Uuid>> {
  let mut stmt = conn.prepare("SELECT student FROM vaccinations WHERE drive_id = ?1")?;
  let ids = stmt
    .query_map(params![encode_uuid(drive_id)], |r| r.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  ids.iter().map(|s| decode_uuid(s)).collect()
}

/// The subset of `ids` already in the drive's ledger.
pub fn vaccinated_among(
  conn: &Connection,
  drive_id: Uuid,
  ids: &[Uuid],
) -> Result<Vec<Uuid>> {
  let mut stmt = conn
    .prepare("SELECT 1 FROM vaccinations WHERE drive_id = ?1 AND student = ?2")?;
  let drive = encode_uuid(drive_id);
  let mut out = vec![];
  for id in ids {
    if stmt.exists(params![drive, encode_uuid(*id)])? {
      out.push(*id);
    }
  }
  Ok(out)
}

pub fn insert_vaccination(conn: &Connection, v: &Vaccination) -> Result<()> {
  let res = conn.execute(
    "INSERT INTO vaccinations (
       id, student, drive_id, date, administered_by, notes, grade
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      encode_uuid(v.id),
      encode_uuid(v.student),
      encode_uuid(v.drive_id),
      encode_date(v.date),
      v.administered_by,
      v.notes,
      v.grade,
    ],
  );
  match res {
    Ok(_) => Ok(()),
    Err(e) if is_unique_violation(&e) => {
      Err(CoreError::AlreadyVaccinated(vec![v.student]).into())
    }
    Err(e) => Err(e.into()),
  }
}

pub fn ledger(conn: &Connection, drive_id: Uuid) -> Result<Vec<LedgerEntry>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {VACCINATION_COLUMNS}, {STUDENT_COLUMNS}
     FROM vaccinations v
     JOIN students s ON s.id = v.student
     WHERE v.drive_id = ?1
     ORDER BY s.student_id, s.id"
  ))?;
  let raws = stmt
    .query_map(params![encode_uuid(drive_id)], |row| {
      Ok((
        RawVaccination::read(row, 0)?,
        RawStudent::read(row, RawVaccination::WIDTH)?,
      ))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws
    .into_iter()
    .map(|(v, s)| {
      Ok(LedgerEntry {
        vaccination: v.into_vaccination()?,
        student:     s.into_student()?,
      })
    })
    .collect()
}

pub fn drive_detail(conn: &Connection, id: Uuid) -> Result<Option<DriveDetail>> {
  let Some(drive) = fetch_drive(conn, id)? else {
    return Ok(None);
  };
  let vaccinations = ledger(conn, id)?;
  Ok(Some(DriveDetail {
    summary: DriveSummary {
      drive,
      vaccinated_count: vaccinations.len() as u32,
    },
    vaccinations,
  }))
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

pub fn dashboard(conn: &Connection, today: NaiveDate) -> Result<DashboardStats> {
  let total_students: u32 =
    conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))?;
  let vaccinated_students: u32 = conn.query_row(
    "SELECT COUNT(DISTINCT student) FROM vaccinations",
    [],
    |r| r.get(0),
  )?;

  let upcoming_drives = select_summaries(
    conn,
    &[
      "d.status = 'scheduled'".to_owned(),
      "d.date BETWEEN ?1 AND ?2".to_owned(),
    ],
    vec![
      Value::Text(encode_date(today)),
      Value::Text(encode_date(window_end(today))),
    ],
    "d.date ASC",
    None,
  )?
  .into_iter()
  .map(|s| s.drive)
  .collect();

  let mut stmt = conn.prepare(
    "SELECT d.vaccine_name, COUNT(v.id)
     FROM drives d
     LEFT JOIN vaccinations v ON v.drive_id = d.id
     GROUP BY d.vaccine_name
     ORDER BY d.vaccine_name",
  )?;
  let vaccinations_by_vaccine = stmt
    .query_map([], |r| {
      Ok(VaccineCount { vaccine_name: r.get(0)?, count: r.get(1)? })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(DashboardStats {
    total_students,
    vaccinated_students,
    vaccination_percentage: coverage_percentage(vaccinated_students, total_students),
    upcoming_drives,
    vaccinations_by_vaccine,
    recent_drives: recent_drives(conn, today, RECENT_DRIVES)?,
  })
}

// ─── Report ──────────────────────────────────────────────────────────────────

fn report_filter(q: &ReportQuery) -> (String, Vec<Value>) {
  let mut conds: Vec<String> = vec![];
  let mut args: Vec<Value> = vec![];

  if let Some(drive_id) = q.drive_id {
    args.push(Value::Text(encode_uuid(drive_id)));
    conds.push(format!("v.drive_id = ?{}", args.len()));
  }
  if let Some(vaccine) =
    q.vaccine_name.as_deref().map(str::trim).filter(|v| !v.is_empty())
  {
    args.push(Value::Text(vaccine.to_owned()));
    conds.push(format!("d.vaccine_name = ?{}", args.len()));
  }
  if let Some(start) = q.start_date {
    args.push(Value::Text(encode_date(start)));
    conds.push(format!("d.date >= ?{}", args.len()));
  }
  if let Some(end) = q.end_date {
    args.push(Value::Text(encode_date(end)));
    conds.push(format!("d.date <= ?{}", args.len()));
  }
  if let Some(grade) = q.grade.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
    args.push(Value::Text(grade.to_owned()));
    conds.push(format!("s.grade = ?{}", args.len()));
  }

  let where_clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  (where_clause, args)
}

const REPORT_FROM: &str = "FROM vaccinations v
     JOIN students s ON s.id = v.student
     JOIN drives   d ON d.id = v.drive_id";

pub fn report_count(conn: &Connection, q: &ReportQuery) -> Result<u32> {
  let (where_clause, args) = report_filter(q);
  Ok(conn.query_row(
    &format!("SELECT COUNT(*) {REPORT_FROM} {where_clause}"),
    params_from_iter(args),
    |r| r.get(0),
  )?)
}

/// Matching rows, newest vaccination first. `paged` applies `limit` and
/// `offset`.
pub fn report_rows(conn: &Connection, q: &ReportQuery, paged: bool) -> Result<Vec<ReportRow>> {
  let (where_clause, args) = report_filter(q);
  let page = if paged {
    format!(
      "LIMIT {} OFFSET {}",
      q.limit.map_or(-1, |n| n as i64),
      q.offset.unwrap_or(0)
    )
  } else {
    String::new()
  };
  let sql = format!(
    "SELECT s.student_id, s.name, s.grade, s.section, d.vaccine_name,
            v.date, d.name, d.date, v.administered_by
     {REPORT_FROM}
     {where_clause}
     ORDER BY v.date DESC, s.student_id, d.date DESC
     {page}"
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params_from_iter(args), RawReportRow::read)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawReportRow::into_row).collect()
}
