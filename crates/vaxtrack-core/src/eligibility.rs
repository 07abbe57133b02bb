//! Which students a drive may still vaccinate.

use std::collections::HashSet;

use uuid::Uuid;

use crate::{drive::Drive, student::Student};

/// Students covered by `drive`'s grades that hold no row in its ledger,
/// ordered by school-issued identifier then record id.
///
/// `vaccinated` is the set of student record ids already in the drive's
/// ledger.
pub fn resolve(
  drive: &Drive,
  students: impl IntoIterator<Item = Student>,
  vaccinated: &HashSet<Uuid>,
) -> Vec<Student> {
  let mut eligible: Vec<Student> = students
    .into_iter()
    .filter(|s| drive.admits_grade(&s.grade) && !vaccinated.contains(&s.id))
    .collect();
  eligible.sort_by(|a, b| a.student_id.cmp(&b.student_id).then(a.id.cmp(&b.id)));
  eligible
}
