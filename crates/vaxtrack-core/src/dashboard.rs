//! Aggregate figures for the coordinator's overview page.

use serde::{Deserialize, Serialize};

use crate::drive::{Drive, DriveSummary};

/// Number of recent drives the stats view includes.
pub const RECENT_DRIVES: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
  pub total_students:          u32,
  pub vaccinated_students:     u32,
  /// Whole-number percentage of students with at least one vaccination.
  pub vaccination_percentage:  u32,
  pub upcoming_drives:         Vec<Drive>,
  pub vaccinations_by_vaccine: Vec<VaccineCount>,
  pub recent_drives:           Vec<DriveSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccineCount {
  pub vaccine_name: String,
  pub count:        u32,
}

/// `vaccinated / total` as a percentage rounded half up; zero when there are
/// no students.
pub fn coverage_percentage(vaccinated: u32, total: u32) -> u32 {
  if total == 0 {
    return 0;
  }
  let (v, t) = (u64::from(vaccinated), u64::from(total));
  ((v * 200 + t) / (t * 2)) as u32
}
