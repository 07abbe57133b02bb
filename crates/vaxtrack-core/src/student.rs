//! Students: the people vaccinations are recorded against.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Result, error::required, ledger::Vaccination};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Gender {
  Male,
  Female,
  Other,
}

/// A registered student.
///
/// `id` is the internal record id that vaccinations reference; `student_id`
/// is the school-issued identifier shown to users and used by CSV imports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub id:             Uuid,
  pub student_id:     String,
  pub name:           String,
  pub date_of_birth:  Option<NaiveDate>,
  pub gender:         Option<Gender>,
  /// A label rather than a number, so "KG" or "10-A" are valid.
  pub grade:          String,
  pub section:        Option<String>,
  pub parent_name:    Option<String>,
  pub contact_number: Option<String>,
  pub address:        Option<String>,
  pub created_at:     DateTime<Utc>,
}

fn clean(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

// ─── NewStudent ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::VaccinationStore::add_student`], from a form or a
/// CSV row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewStudent {
  #[serde(alias = "studentId")]
  pub student_id:     String,
  pub name:           String,
  #[serde(alias = "dateOfBirth")]
  pub date_of_birth:  Option<NaiveDate>,
  pub gender:         Option<Gender>,
  pub grade:          String,
  pub section:        Option<String>,
  #[serde(alias = "parentName")]
  pub parent_name:    Option<String>,
  #[serde(alias = "contactNumber")]
  pub contact_number: Option<String>,
  pub address:        Option<String>,
}

impl NewStudent {
  pub fn validate(&self) -> Result<()> {
    required("student_id", &self.student_id)?;
    required("name", &self.name)?;
    required("grade", &self.grade)
  }

  pub fn into_student(self, created_at: DateTime<Utc>) -> Student {
    Student {
      id: Uuid::new_v4(),
      student_id: self.student_id.trim().to_owned(),
      name: self.name.trim().to_owned(),
      date_of_birth: self.date_of_birth,
      gender: self.gender,
      grade: self.grade.trim().to_owned(),
      section: clean(self.section),
      parent_name: clean(self.parent_name),
      contact_number: clean(self.contact_number),
      address: clean(self.address),
      created_at,
    }
  }
}

// ─── StudentPatch ────────────────────────────────────────────────────────────

/// Partial update. For optional text fields an empty string clears the value.
///
/// Editing a student never rewrites history: each vaccination keeps the
/// grade the student had when it was recorded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentPatch {
  #[serde(alias = "studentId")]
  pub student_id:     Option<String>,
  pub name:           Option<String>,
  #[serde(alias = "dateOfBirth")]
  pub date_of_birth:  Option<NaiveDate>,
  pub gender:         Option<Gender>,
  pub grade:          Option<String>,
  pub section:        Option<String>,
  #[serde(alias = "parentName")]
  pub parent_name:    Option<String>,
  #[serde(alias = "contactNumber")]
  pub contact_number: Option<String>,
  pub address:        Option<String>,
}

impl StudentPatch {
  pub fn apply(self, student: &mut Student) -> Result<()> {
    if let Some(sid) = self.student_id {
      required("student_id", &sid)?;
      student.student_id = sid.trim().to_owned();
    }
    if let Some(name) = self.name {
      required("name", &name)?;
      student.name = name.trim().to_owned();
    }
    if let Some(grade) = self.grade {
      required("grade", &grade)?;
      student.grade = grade.trim().to_owned();
    }
    if self.date_of_birth.is_some() {
      student.date_of_birth = self.date_of_birth;
    }
    if self.gender.is_some() {
      student.gender = self.gender;
    }
    if self.section.is_some() {
      student.section = clean(self.section);
    }
    if self.parent_name.is_some() {
      student.parent_name = clean(self.parent_name);
    }
    if self.contact_number.is_some() {
      student.contact_number = clean(self.contact_number);
    }
    if self.address.is_some() {
      student.address = clean(self.address);
    }
    Ok(())
  }
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// One vaccination on a student's record, with the drive it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentVaccination {
  #[serde(flatten)]
  pub vaccination:  Vaccination,
  pub drive_name:   String,
  pub vaccine_name: String,
  pub drive_date:   NaiveDate,
}

/// A student together with every vaccination they have received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRecord {
  #[serde(flatten)]
  pub student:      Student,
  pub vaccinations: Vec<StudentVaccination>,
}

// ─── Query ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaccinationStatus {
  Vaccinated,
  #[serde(alias = "not-vaccinated")]
  NotVaccinated,
}

/// Parameters for [`crate::store::VaccinationStore::list_students`].
#[derive(Debug, Clone, Default)]
pub struct StudentQuery {
  /// Case-insensitive substring match on the name.
  pub name:               Option<String>,
  /// Any of these grades. Empty means no grade filter.
  pub grades:             Vec<String>,
  /// Case-insensitive substring match on the school-issued identifier.
  pub student_id:         Option<String>,
  /// Relative to `drive_id` when given, otherwise to any drive.
  pub vaccination_status: Option<VaccinationStatus>,
  pub drive_id:           Option<Uuid>,
}
