//! Router tests against an in-memory SQLite store with a pinned clock.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::{Days, NaiveDate};
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;
use vaxtrack_core::{
  clock::FixedClock,
  drive::NewDrive,
  store::VaccinationStore,
  student::{NewStudent, Student},
};
use vaxtrack_store_sqlite::SqliteStore;

use crate::{Principal, api_router};

fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2025, 3, 10).unwrap() }

fn days_from_today(n: u64) -> NaiveDate {
  today().checked_add_days(Days::new(n)).unwrap()
}

async fn setup() -> (Arc<SqliteStore>, Router) {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let app = api_router(store.clone(), Arc::new(FixedClock(today())));
  (store, app)
}

async fn send(
  app: &Router,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(json) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

async fn add_student(store: &SqliteStore, student_id: &str, grade: &str) -> Student {
  store
    .add_student(NewStudent {
      student_id:     student_id.into(),
      name:           format!("Student {student_id}"),
      date_of_birth:  None,
      gender:         None,
      grade:          grade.into(),
      section:        None,
      parent_name:    None,
      contact_number: None,
      address:        None,
    })
    .await
    .unwrap()
}

/// A drive dated today, scheduled back when that was far enough ahead.
async fn drive_due_today(store: &SqliteStore, doses: u32, grades: &[&str]) -> Uuid {
  let created_on = today().checked_sub_days(Days::new(20)).unwrap();
  store
    .create_drive(
      NewDrive {
        name:              "Polio round".into(),
        vaccine_name:      "OPV".into(),
        date:              today(),
        total_doses:       doses,
        applicable_grades: grades.iter().map(|g| (*g).to_owned()).collect(),
        description:       None,
      },
      created_on,
    )
    .await
    .unwrap()
    .id
}

fn drive_body(date: NaiveDate) -> Value {
  json!({
    "name": "Measles round",
    "vaccine_name": "MMR",
    "date": date,
    "total_doses": 30,
    "applicable_grades": ["5", "6"]
  })
}

// ── Drives ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_get_drive() {
  let (_, app) = setup().await;
  let (status, created) =
    send(&app, "POST", "/drives", Some(drive_body(days_from_today(15)))).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(created["status"], "scheduled");
  assert_eq!(created["available_doses"], 30);

  let id = created["id"].as_str().unwrap();
  let (status, detail) = send(&app, "GET", &format!("/drives/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(detail["vaccinated_count"], 0);
  assert_eq!(detail["vaccinations"], json!([]));
}

#[tokio::test]
async fn drive_too_soon_reports_earliest_date() {
  let (_, app) = setup().await;
  let (status, body) =
    send(&app, "POST", "/drives", Some(drive_body(days_from_today(14)))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "scheduling_too_soon");
  assert_eq!(body["details"]["earliest"], json!(days_from_today(15)));
}

#[tokio::test]
async fn second_drive_on_same_date_is_conflict() {
  let (_, app) = setup().await;
  let date = days_from_today(20);
  send(&app, "POST", "/drives", Some(drive_body(date))).await;
  let (status, body) = send(&app, "POST", "/drives", Some(drive_body(date))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["error"], "date_conflict");
}

#[tokio::test]
async fn unknown_drive_is_not_found() {
  let (_, app) = setup().await;
  let (status, body) =
    send(&app, "GET", &format!("/drives/{}", Uuid::new_v4()), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn cancel_then_delete_is_rejected() {
  let (_, app) = setup().await;
  let (_, created) =
    send(&app, "POST", "/drives", Some(drive_body(days_from_today(30)))).await;
  let id = created["id"].as_str().unwrap();

  let (status, cancelled) =
    send(&app, "POST", &format!("/drives/{id}/cancel"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(cancelled["status"], "cancelled");

  let (status, body) = send(&app, "DELETE", &format!("/drives/{id}"), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "cancelled");
}

#[tokio::test]
async fn list_upcoming_window() {
  let (_, app) = setup().await;
  send(&app, "POST", "/drives", Some(drive_body(days_from_today(20)))).await;
  send(&app, "POST", "/drives", Some(drive_body(days_from_today(45)))).await;

  let (status, all) = send(&app, "GET", "/drives", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(all.as_array().unwrap().len(), 2);

  let (_, upcoming) = send(&app, "GET", "/drives?upcoming=true", None).await;
  assert_eq!(upcoming.as_array().unwrap().len(), 1);
}

// ── Recording ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn vaccinate_until_exhausted() {
  let (store, app) = setup().await;
  let a = add_student(&store, "A", "5").await;
  let b = add_student(&store, "B", "5").await;
  let c = add_student(&store, "C", "5").await;
  let drive = drive_due_today(&store, 2, &[]).await;
  let uri = format!("/drives/{drive}/vaccinate");

  let (status, detail) = send(
    &app,
    "POST",
    &uri,
    Some(json!({ "studentIds": [a.id, b.id], "administeredBy": "Nurse Joy" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(detail["available_doses"], 0);
  assert_eq!(detail["status"], "completed");
  assert_eq!(detail["vaccinations"][0]["administered_by"], "Nurse Joy");

  let (status, body) =
    send(&app, "POST", &uri, Some(json!({ "student_ids": [c.id] }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["error"], "insufficient_doses");
  assert_eq!(body["details"], json!({ "remaining": 0, "requested": 1 }));
}

#[tokio::test]
async fn vaccinate_reports_offending_students() {
  let (store, app) = setup().await;
  let a = add_student(&store, "A", "5").await;
  let other = add_student(&store, "B", "9").await;
  let drive = drive_due_today(&store, 10, &["5"]).await;
  let uri = format!("/drives/{drive}/vaccinate");

  let (status, body) =
    send(&app, "POST", &uri, Some(json!({ "student_ids": [other.id] }))).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["error"], "not_eligible");
  assert_eq!(body["details"]["student_ids"], json!([other.id]));

  send(&app, "POST", &uri, Some(json!({ "student_ids": [a.id] }))).await;
  let (status, body) =
    send(&app, "POST", &uri, Some(json!({ "student_ids": [a.id] }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["error"], "already_vaccinated");

  let (status, body) =
    send(&app, "POST", &uri, Some(json!({ "student_ids": [] }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "empty_batch");
}

#[tokio::test]
async fn eligible_excludes_vaccinated() {
  let (store, app) = setup().await;
  let a = add_student(&store, "A", "5").await;
  let b = add_student(&store, "B", "5").await;
  let drive = drive_due_today(&store, 10, &["5"]).await;
  send(
    &app,
    "POST",
    &format!("/drives/{drive}/vaccinate"),
    Some(json!({ "student_ids": [a.id] })),
  )
  .await;

  let (status, eligible) =
    send(&app, "GET", &format!("/drives/{drive}/eligible"), None).await;
  assert_eq!(status, StatusCode::OK);
  let ids: Vec<&str> = eligible
    .as_array()
    .unwrap()
    .iter()
    .map(|s| s["id"].as_str().unwrap())
    .collect();
  assert_eq!(ids, vec![b.id.to_string()]);
}

#[tokio::test]
async fn principal_defaults_to_anonymous() {
  let (store, app) = setup().await;
  let drive = drive_due_today(&store, 1, &[]).await;
  let req = Request::builder()
    .method("POST")
    .uri(format!("/drives/{drive}/cancel"))
    .extension(Principal("nurse".into()))
    .body(Body::empty())
    .unwrap();
  let resp = app.clone().oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(Principal::anonymous().to_string(), "anonymous");
}

// ── Students ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn student_crud() {
  let (_, app) = setup().await;
  let (status, created) = send(
    &app,
    "POST",
    "/students",
    Some(json!({ "student_id": "ST001", "name": "Asha Rao", "grade": "5" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let id = created["id"].as_str().unwrap().to_owned();

  let (status, body) = send(
    &app,
    "POST",
    "/students",
    Some(json!({ "student_id": "ST001", "name": "Other", "grade": "6" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["error"], "duplicate_student_id");

  let (status, updated) = send(
    &app,
    "PUT",
    &format!("/students/{id}"),
    Some(json!({ "grade": "6", "section": "B" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(updated["grade"], "6");

  let (status, record) = send(&app, "GET", &format!("/students/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(record["section"], "B");
  assert_eq!(record["vaccinations"], json!([]));

  let (status, _) = send(&app, "DELETE", &format!("/students/{id}"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = send(&app, "GET", &format!("/students/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn camel_case_bodies_are_accepted() {
  let (_, app) = setup().await;
  let (status, drive) = send(
    &app,
    "POST",
    "/drives",
    Some(json!({
      "name": "Hep B round",
      "vaccineName": "HepB",
      "date": days_from_today(16),
      "totalDoses": 12,
      "applicableGrades": ["3"]
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(drive["vaccine_name"], "HepB");
  assert_eq!(drive["applicable_grades"], json!(["3"]));

  let id = drive["id"].as_str().unwrap();
  let (status, drive) = send(
    &app,
    "PUT",
    &format!("/drives/{id}"),
    Some(json!({ "totalDoses": 20 })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(drive["available_doses"], 20);

  let (status, student) = send(
    &app,
    "POST",
    "/students",
    Some(json!({
      "studentId": "ST042",
      "name": "Meena",
      "grade": "3",
      "dateOfBirth": "2016-04-02",
      "parentName": "Lakshmi",
      "contactNumber": "9876500000"
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(student["student_id"], "ST042");
  assert_eq!(student["parent_name"], "Lakshmi");

  let id = student["id"].as_str().unwrap();
  let (status, student) = send(
    &app,
    "PUT",
    &format!("/students/{id}"),
    Some(json!({ "contactNumber": "9000000000" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(student["contact_number"], "9000000000");
}

#[tokio::test]
async fn list_students_by_grade_list_and_status() {
  let (store, app) = setup().await;
  let a = add_student(&store, "A", "5").await;
  add_student(&store, "B", "6").await;
  add_student(&store, "C", "7").await;
  let drive = drive_due_today(&store, 10, &[]).await;
  store
    .record_vaccinations(
      drive,
      vaxtrack_core::ledger::RecordRequest {
        student_ids: vec![a.id],
        ..Default::default()
      },
      today(),
    )
    .await
    .unwrap();

  let (_, by_grade) = send(&app, "GET", "/students?grade=5,%206", None).await;
  assert_eq!(by_grade.as_array().unwrap().len(), 2);

  let (_, pending) = send(
    &app,
    "GET",
    &format!("/students?vaccination_status=not_vaccinated&drive_id={drive}"),
    None,
  )
  .await;
  let ids: Vec<&str> = pending
    .as_array()
    .unwrap()
    .iter()
    .map(|s| s["student_id"].as_str().unwrap())
    .collect();
  assert_eq!(ids, vec!["B", "C"]);
}

#[tokio::test]
async fn delete_vaccinated_student_is_conflict() {
  let (store, app) = setup().await;
  let a = add_student(&store, "A", "5").await;
  let drive = drive_due_today(&store, 10, &[]).await;
  send(
    &app,
    "POST",
    &format!("/drives/{drive}/vaccinate"),
    Some(json!({ "student_ids": [a.id] })),
  )
  .await;

  let (status, body) =
    send(&app, "DELETE", &format!("/students/{}", a.id), None).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["error"], "has_vaccinations");
}

// ── Import ───────────────────────────────────────────────────────────────────

async fn upload(app: &Router, csv: &str) -> (StatusCode, Value) {
  let req = Request::builder()
    .method("POST")
    .uri("/students/bulk-import")
    .header(header::CONTENT_TYPE, "text/csv")
    .body(Body::from(csv.to_owned()))
    .unwrap();
  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn bulk_import_success() {
  let (_, app) = setup().await;
  let (status, report) = upload(
    &app,
    "studentId,name,grade,dateOfBirth\nA1,Asha,5,21-07-2014\nA2,Ravi,6,\n",
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(report, json!({ "imported": 2, "failed": [] }));
}

#[tokio::test]
async fn bulk_import_reads_file_part_of_multipart_form() {
  let (_, app) = setup().await;
  let body = "--XBOUND\r\n\
              Content-Disposition: form-data; name=\"note\"\r\n\r\n\
              spring roster\r\n\
              --XBOUND\r\n\
              Content-Disposition: form-data; name=\"file\"; filename=\"students.csv\"\r\n\
              Content-Type: text/csv\r\n\r\n\
              studentId,name,grade\nA1,Asha,5\nA2,Ravi,6\n\r\n\
              --XBOUND--\r\n";
  let req = Request::builder()
    .method("POST")
    .uri("/students/bulk-import")
    .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUND")
    .body(Body::from(body))
    .unwrap();
  let resp = app.clone().oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::CREATED);
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let report: Value = serde_json::from_slice(&bytes).unwrap();
  assert_eq!(report, json!({ "imported": 2, "failed": [] }));

  let (_, students) = send(&app, "GET", "/students?student_id=A", None).await;
  assert_eq!(students.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn bulk_import_multipart_without_file_part() {
  let (_, app) = setup().await;
  let body = "--XBOUND\r\n\
              Content-Disposition: form-data; name=\"roster\"\r\n\r\n\
              studentId,name,grade\nA1,Asha,5\n\r\n\
              --XBOUND--\r\n";
  let req = Request::builder()
    .method("POST")
    .uri("/students/bulk-import")
    .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUND")
    .body(Body::from(body))
    .unwrap();
  let resp = app.clone().oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_import_validation_rejects_everything() {
  let (_, app) = setup().await;
  let (status, body) = upload(
    &app,
    "studentId,name,grade,dateOfBirth\nA1,Asha,5,31-02-2020\nA2,Ravi,6,\n",
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["error"], "validation_errors");
  assert_eq!(body["details"]["errors"][0]["row"], 1);

  let (_, students) = send(&app, "GET", "/students", None).await;
  assert_eq!(students, json!([]));
}

#[tokio::test]
async fn bulk_import_partial_failure() {
  let (store, app) = setup().await;
  add_student(&store, "S3", "5").await;
  let csv = "studentId,name,grade\nS1,One,5\nS2,Two,5\nS3,Three,5\nS4,Four,5\nS5,Five,5\n";
  let (status, body) = upload(&app, csv).await;
  assert_eq!(status, StatusCode::MULTI_STATUS);
  assert_eq!(body["error"], "partial_import_failure");
  assert_eq!(body["details"]["imported"], 4);
  assert_eq!(body["details"]["failed"][0]["row"], 3);
}

#[tokio::test]
async fn bulk_import_missing_headers() {
  let (_, app) = setup().await;
  let (status, body) = upload(&app, "studentId,name\nA1,Asha\n").await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["details"]["missing"], json!(["grade"]));
}

// ── Dashboard & reports ──────────────────────────────────────────────────────

#[tokio::test]
async fn dashboard_endpoints() {
  let (store, app) = setup().await;
  let a = add_student(&store, "A", "5").await;
  add_student(&store, "B", "5").await;
  let drive = drive_due_today(&store, 10, &[]).await;
  send(
    &app,
    "POST",
    &format!("/drives/{drive}/vaccinate"),
    Some(json!({ "student_ids": [a.id] })),
  )
  .await;

  let (status, stats) = send(&app, "GET", "/dashboard/stats", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(stats["total_students"], 2);
  assert_eq!(stats["vaccinated_students"], 1);
  assert_eq!(stats["vaccination_percentage"], 50);

  let (_, recent) = send(&app, "GET", "/dashboard/recent-drives?limit=1", None).await;
  assert_eq!(recent[0]["vaccinated_count"], 1);

  let (_, upcoming) = send(&app, "GET", "/dashboard/upcoming-drives", None).await;
  assert_eq!(upcoming, json!([]));
}

#[tokio::test]
async fn report_json_and_csv() {
  let (store, app) = setup().await;
  let a = add_student(&store, "A", "5").await;
  let b = add_student(&store, "B", "6").await;
  let drive = drive_due_today(&store, 10, &[]).await;
  send(
    &app,
    "POST",
    &format!("/drives/{drive}/vaccinate"),
    Some(json!({ "student_ids": [a.id, b.id] })),
  )
  .await;

  let (status, page) = send(&app, "GET", "/reports?grade=6", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(page["total"], 1);
  assert_eq!(page["rows"][0]["student_id"], "B");

  let req = Request::builder()
    .uri("/reports?format=csv&vaccine_name=OPV")
    .body(Body::empty())
    .unwrap();
  let resp = app.clone().oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  assert!(
    resp.headers()[header::CONTENT_DISPOSITION]
      .to_str()
      .unwrap()
      .contains("vaccination-report.csv")
  );
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let text = String::from_utf8(bytes.to_vec()).unwrap();
  assert!(text.starts_with("studentId,studentName,grade"));
  assert_eq!(text.lines().count(), 3);
}

#[tokio::test]
async fn report_rejects_inverted_range() {
  let (_, app) = setup().await;
  let (status, body) = send(
    &app,
    "GET",
    "/reports?start_date=2025-03-10&end_date=2025-03-01",
    None,
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "bad_request");
}
