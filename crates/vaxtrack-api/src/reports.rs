//! `GET /reports`: the ledger report as a JSON page or a CSV download.

use axum::{
  Json,
  extract::{Query, State},
  http::header,
  response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use vaxtrack_core::{report::ReportQuery, store::VaccinationStore};

use crate::{ApiState, error::ApiError};

const CSV_FILENAME: &str = "vaccination-report.csv";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
  #[default]
  Json,
  Csv,
}

/// Query string for the report. Listed out rather than flattening
/// [`ReportQuery`], since flattened numbers do not survive URL decoding.
#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
  #[serde(default)]
  pub format:       Format,
  #[serde(alias = "driveId")]
  pub drive_id:     Option<Uuid>,
  #[serde(alias = "vaccineName")]
  pub vaccine_name: Option<String>,
  #[serde(alias = "startDate")]
  pub start_date:   Option<NaiveDate>,
  #[serde(alias = "endDate")]
  pub end_date:     Option<NaiveDate>,
  pub grade:        Option<String>,
  pub limit:        Option<usize>,
  pub offset:       Option<usize>,
}

impl ReportParams {
  fn split(self) -> (Format, ReportQuery) {
    let query = ReportQuery {
      drive_id:     self.drive_id,
      vaccine_name: self.vaccine_name.filter(|v| !v.trim().is_empty()),
      start_date:   self.start_date,
      end_date:     self.end_date,
      grade:        self.grade.filter(|g| !g.trim().is_empty()),
      limit:        self.limit,
      offset:       self.offset,
    };
    (self.format, query)
  }
}

/// `GET /reports[?format=csv&drive_id=..&vaccine_name=..&start_date=..]`
pub async fn handler<S: VaccinationStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ReportParams>,
) -> Result<Response, ApiError> {
  let (format, query) = params.split();
  if let (Some(start), Some(end)) = (query.start_date, query.end_date)
    && start > end
  {
    return Err(ApiError::BadRequest(format!(
      "start_date {start} is after end_date {end}"
    )));
  }

  match format {
    Format::Json => {
      let page = state
        .store
        .report(&query)
        .await
        .map_err(ApiError::from_store)?;
      Ok(Json(page).into_response())
    }
    Format::Csv => {
      let rows = state
        .store
        .report_all(&query)
        .await
        .map_err(ApiError::from_store)?;
      let body = vaxtrack_csv::write_report(&rows)?;
      Ok(
        (
          [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (
              header::CONTENT_DISPOSITION,
              format!("attachment; filename=\"{CSV_FILENAME}\""),
            ),
          ],
          body,
        )
          .into_response(),
      )
    }
  }
}
