//! Vaccination drives: scheduled events with a finite dose capacity.
//!
//! Whether a drive can still be edited, deleted, or recorded against is
//! decided in exactly one place: [`DrivePhase::classify`]. Every operation
//! gates on the phase rather than comparing dates inline.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result, error::required};

/// Minimum number of days between today and a newly scheduled drive date.
pub const MIN_LEAD_DAYS: u64 = 15;

/// How far ahead of its date a drive already accepts vaccinations. Absorbs
/// timezone skew between the recording client and the server.
pub const RECORDING_GRACE_DAYS: u64 = 1;

/// Length of the "upcoming drives" window used by listings and the dashboard.
pub const UPCOMING_WINDOW_DAYS: u64 = 30;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Persisted lifecycle status. Moves only forward:
/// `scheduled → completed`, `scheduled | completed → cancelled`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DriveStatus {
  #[default]
  Scheduled,
  Completed,
  Cancelled,
}

// ─── Phase ───────────────────────────────────────────────────────────────────

/// Where a drive's date sits relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Timing {
  /// More than the grace window away.
  Upcoming,
  /// Tomorrow. Still editable, but already inside the recording grace
  /// window.
  Imminent,
  Today,
  Elapsed,
}

/// The named state of a drive on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DrivePhase {
  pub status: DriveStatus,
  pub timing: Timing,
}

impl DrivePhase {
  pub fn classify(today: NaiveDate, date: NaiveDate, status: DriveStatus) -> Self {
    let days_ahead = (date - today).num_days();
    let timing = if days_ahead > RECORDING_GRACE_DAYS as i64 {
      Timing::Upcoming
    } else if days_ahead > 0 {
      Timing::Imminent
    } else if days_ahead == 0 {
      Timing::Today
    } else {
      Timing::Elapsed
    };
    Self { status, timing }
  }

  /// The drive's date is still strictly in the future.
  pub fn in_future(&self) -> bool {
    matches!(self.timing, Timing::Upcoming | Timing::Imminent)
  }

  /// Today is on or after the start of the recording grace window.
  pub fn is_due(&self) -> bool { !matches!(self.timing, Timing::Upcoming) }
}

// ─── Drive ───────────────────────────────────────────────────────────────────

/// A scheduled vaccination event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drive {
  pub id:                Uuid,
  pub name:              String,
  pub vaccine_name:      String,
  pub date:              NaiveDate,
  /// Dose capacity: the most Vaccination rows this drive may ever hold.
  pub total_doses:       u32,
  /// Cached `total_doses − ledger count`; recomputed on every write.
  pub available_doses:   u32,
  /// Grade labels this drive covers. Empty means every grade.
  pub applicable_grades: Vec<String>,
  pub status:            DriveStatus,
  pub description:       Option<String>,
  pub created_at:        DateTime<Utc>,
}

impl Drive {
  pub fn phase(&self, today: NaiveDate) -> DrivePhase {
    DrivePhase::classify(today, self.date, self.status)
  }

  /// Gate for Update and Delete: the date must still be in the future and
  /// the drive must still be `scheduled`.
  pub fn ensure_editable(&self, today: NaiveDate) -> Result<DrivePhase> {
    let phase = self.phase(today);
    if !phase.in_future() {
      return Err(Error::DriveInPast(self.date));
    }
    match phase.status {
      DriveStatus::Scheduled => Ok(phase),
      DriveStatus::Cancelled => Err(Error::Cancelled(self.id)),
      status @ DriveStatus::Completed => {
        Err(Error::DriveClosed { id: self.id, status })
      }
    }
  }

  /// Gate for recording. A completed drive passes; its capacity check is
  /// what turns it away.
  pub fn ensure_recordable(&self, today: NaiveDate) -> Result<DrivePhase> {
    let phase = self.phase(today);
    if !phase.is_due() {
      return Err(Error::DriveNotYetDue { date: self.date, today });
    }
    if phase.status == DriveStatus::Cancelled {
      return Err(Error::Cancelled(self.id));
    }
    Ok(phase)
  }

  /// Whether a student in `grade` is covered by this drive.
  pub fn admits_grade(&self, grade: &str) -> bool {
    let grade = grade.trim();
    self.applicable_grades.is_empty()
      || self.applicable_grades.iter().any(|g| g == grade)
  }

  /// Recompute the dose projection from the ledger count. Flips a scheduled
  /// drive to `completed` once the last dose is gone.
  pub fn refresh_doses(&mut self, recorded: u32) {
    self.available_doses = self.total_doses.saturating_sub(recorded);
    if self.available_doses == 0 && self.status == DriveStatus::Scheduled {
      self.status = DriveStatus::Completed;
    }
  }

  /// Transition to `cancelled`. Cancelling twice is rejected.
  pub fn cancel(&mut self) -> Result<()> {
    if self.status == DriveStatus::Cancelled {
      return Err(Error::Cancelled(self.id));
    }
    self.status = DriveStatus::Cancelled;
    Ok(())
  }
}

/// A drive with the size of its ledger, as shown in listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveSummary {
  #[serde(flatten)]
  pub drive:            Drive,
  pub vaccinated_count: u32,
}

// ─── Scheduling rules ────────────────────────────────────────────────────────

/// The earliest date a drive created today may be scheduled for.
pub fn earliest_schedulable(today: NaiveDate) -> NaiveDate {
  today
    .checked_add_days(Days::new(MIN_LEAD_DAYS))
    .unwrap_or(NaiveDate::MAX)
}

/// Enforce the advance-scheduling floor. Exactly [`MIN_LEAD_DAYS`] ahead is
/// allowed.
pub fn check_lead_time(date: NaiveDate, today: NaiveDate) -> Result<()> {
  let earliest = earliest_schedulable(today);
  if date < earliest {
    return Err(Error::SchedulingTooSoon { date, earliest });
  }
  Ok(())
}

/// Trim grade labels, drop blanks and duplicates, keep first-seen order.
pub fn normalize_grades(grades: Vec<String>) -> Vec<String> {
  let mut out: Vec<String> = Vec::with_capacity(grades.len());
  for g in grades {
    let g = g.trim();
    if !g.is_empty() && !out.iter().any(|seen| seen == g) {
      out.push(g.to_owned());
    }
  }
  out
}

// ─── NewDrive ────────────────────────────────────────────────────────────────

/// Input to [`crate::store::VaccinationStore::create_drive`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewDrive {
  pub name:              String,
  #[serde(alias = "vaccineName")]
  pub vaccine_name:      String,
  pub date:              NaiveDate,
  #[serde(alias = "totalDoses")]
  pub total_doses:       u32,
  #[serde(default, alias = "applicableGrades")]
  pub applicable_grades: Vec<String>,
  pub description:       Option<String>,
}

impl NewDrive {
  /// Field-level checks and the scheduling floor. The date-conflict check
  /// needs the store and happens there.
  pub fn validate(&self, today: NaiveDate) -> Result<()> {
    required("name", &self.name)?;
    required("vaccine_name", &self.vaccine_name)?;
    if self.total_doses == 0 {
      return Err(Error::InvalidInput(
        "total_doses must be at least 1".to_owned(),
      ));
    }
    check_lead_time(self.date, today)
  }

  /// Build the persisted drive. Call [`NewDrive::validate`] first.
  pub fn into_drive(self, created_at: DateTime<Utc>) -> Drive {
    Drive {
      id: Uuid::new_v4(),
      name: self.name.trim().to_owned(),
      vaccine_name: self.vaccine_name.trim().to_owned(),
      date: self.date,
      total_doses: self.total_doses,
      available_doses: self.total_doses,
      applicable_grades: normalize_grades(self.applicable_grades),
      status: DriveStatus::Scheduled,
      description: self
        .description
        .map(|d| d.trim().to_owned())
        .filter(|d| !d.is_empty()),
      created_at,
    }
  }
}

// ─── DrivePatch ──────────────────────────────────────────────────────────────

/// Partial update; absent fields are left untouched. An empty `description`
/// clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrivePatch {
  pub name:              Option<String>,
  #[serde(alias = "vaccineName")]
  pub vaccine_name:      Option<String>,
  pub date:              Option<NaiveDate>,
  #[serde(alias = "totalDoses")]
  pub total_doses:       Option<u32>,
  #[serde(alias = "applicableGrades")]
  pub applicable_grades: Option<Vec<String>>,
  pub description:       Option<String>,
}

impl DrivePatch {
  /// The new date, if the patch actually moves the drive.
  pub fn moved_date(&self, drive: &Drive) -> Option<NaiveDate> {
    self.date.filter(|d| *d != drive.date)
  }

  /// Apply the patch to `drive`, given the drive's current ledger count.
  ///
  /// Does not check editability or date conflicts; the caller gates on
  /// [`Drive::ensure_editable`] and queries the store for conflicts.
  pub fn apply(self, drive: &mut Drive, recorded: u32, today: NaiveDate) -> Result<()> {
    if let Some(date) = self.moved_date(drive) {
      check_lead_time(date, today)?;
      drive.date = date;
    }
    if let Some(name) = self.name {
      required("name", &name)?;
      drive.name = name.trim().to_owned();
    }
    if let Some(vaccine) = self.vaccine_name {
      required("vaccine_name", &vaccine)?;
      drive.vaccine_name = vaccine.trim().to_owned();
    }
    if let Some(total) = self.total_doses {
      if total == 0 {
        return Err(Error::InvalidInput(
          "total_doses must be at least 1".to_owned(),
        ));
      }
      if total < recorded {
        return Err(Error::InvalidInput(format!(
          "total_doses cannot drop below the {recorded} dose(s) already \
           administered"
        )));
      }
      drive.total_doses = total;
    }
    if let Some(grades) = self.applicable_grades {
      drive.applicable_grades = normalize_grades(grades);
    }
    if let Some(description) = self.description {
      let description = description.trim();
      drive.description =
        (!description.is_empty()).then(|| description.to_owned());
    }
    drive.refresh_doses(recorded);
    Ok(())
  }
}

// ─── Listing filter ──────────────────────────────────────────────────────────

/// Parameters for [`crate::store::VaccinationStore::list_drives`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriveQuery {
  pub status:   Option<DriveStatus>,
  /// Only scheduled drives dated within the next
  /// [`UPCOMING_WINDOW_DAYS`] days (today inclusive).
  #[serde(default)]
  pub upcoming: bool,
  /// Only drives dated before today.
  #[serde(default)]
  pub past:     bool,
}
