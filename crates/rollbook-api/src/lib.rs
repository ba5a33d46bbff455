//! JSON REST API for the rollbook attendance service.
//!
//! Exposes an axum [`Router`] backed by any
//! [`rollbook_core::store::RollbookStore`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rollbook_api::api_router(store.clone()))
//! ```

pub mod attendance;
pub mod error;
pub mod list;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch},
};
use rollbook_core::store::RollbookStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: RollbookStore + 'static,
{
  Router::new()
    .route(
      "/attendance",
      get(list::list::<S>).post(attendance::upsert::<S>),
    )
    .route("/attendance/by-user", get(list::by_user::<S>))
    .route(
      "/attendance/by-student-name",
      get(list::by_student_name::<S>),
    )
    .route("/attendance/correct", patch(attendance::correct::<S>))
    .route(
      "/attendance/{id}",
      patch(attendance::update_one::<S>).delete(attendance::delete_one::<S>),
    )
    .with_state(store)
}

#[cfg(test)]
mod tests {
  use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
  };
  use rollbook_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;
  use rollbook_core::{
    store::RollbookStore as _,
    student::{NewStudent, Student},
  };

  async fn seeded() -> (Router, Vec<Student>) {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let mut students = Vec::new();
    for (roll, name, class) in
      [(17, "Amit Rao", "5A"), (18, "Binu Nair", "5A"), (30, "Chitra", "6B")]
    {
      students.push(
        store
          .add_student(NewStudent {
            roll_number: roll,
            name:        name.to_owned(),
            class_name:  class.to_owned(),
            mobile:      None,
            email:       None,
          })
          .await
          .unwrap(),
      );
    }
    (api_router(store), students)
  }

  async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let req = match body {
      Some(json_body) => Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json_body.to_string()))
        .unwrap(),
      None => {
        Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
      }
    };
    let resp = router.clone().oneshot(req).await.unwrap();
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

  fn upsert_body(refs: Value, status: &str) -> Value {
    json!({
      "studentIds": refs,
      "className": "5A",
      "teacher": "Ms. Iyer",
      "username": "teacher1",
      "date": "2025-03-10",
      "status": status,
    })
  }

  #[tokio::test]
  async fn upsert_then_reupsert_counts_flip() {
    let (router, students) = seeded().await;

    // Mixed references: roll as number, roll as string, internal id.
    let refs = json!([17, "18", students[2].student_id.to_string()]);
    let (status, body) =
      send(&router, "POST", "/attendance", Some(upsert_body(refs.clone(), "Present")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Attendance saved.");
    assert_eq!(body["created"], 3);
    assert_eq!(body["updated"], 0);

    let (status, body) =
      send(&router, "POST", "/attendance", Some(upsert_body(refs, "Absent")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], 0);
    assert_eq!(body["updated"], 3);

    let (status, body) = send(&router, "GET", "/attendance", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert!(
      body["data"]
        .as_array()
        .unwrap()
        .iter()
        .all(|row| row["status"] == "Absent")
    );
  }

  #[tokio::test]
  async fn upsert_validates_before_writing() {
    let (router, _) = seeded().await;

    // Missing required fields.
    let (status, _) = send(
      &router,
      "POST",
      "/attendance",
      Some(json!({ "studentIds": [17], "date": "2025-03-10" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Status outside the enum.
    let (status, body) =
      send(&router, "POST", "/attendance", Some(upsert_body(json!([17]), "Sick")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Sick"));

    // No target students at all.
    let (status, _) = send(
      &router,
      "POST",
      "/attendance",
      Some(json!({
        "className": "5A", "teacher": "T", "username": "u",
        "date": "2025-03-10", "status": "Present",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unparseable date, after an otherwise valid payload.
    let (status, _) = send(
      &router,
      "POST",
      "/attendance",
      Some(json!({
        "studentIds": [17],
        "className": "5A", "teacher": "T", "username": "u",
        "date": "not-a-date", "status": "Present",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn unknown_students_are_not_found() {
    let (router, _) = seeded().await;

    let (status, _) =
      send(&router, "POST", "/attendance", Some(upsert_body(json!([999]), "Present")))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
      &router,
      "POST",
      "/attendance",
      Some(json!({
        "studentId": uuid::Uuid::new_v4().to_string(),
        "className": "5A", "teacher": "T", "username": "u",
        "date": "2025-03-10", "status": "Present",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn correction_is_idempotent_and_audited() {
    let (router, _) = seeded().await;
    send(&router, "POST", "/attendance", Some(upsert_body(json!([17]), "Present")))
      .await;

    let correct = |new_status: &str, reason: Option<&str>| {
      let mut body = json!({
        "studentId": 17,
        "date": "2025-03-10T09:00:00Z",
        "newStatus": new_status,
        "correctedBy": "admin",
      });
      if let Some(r) = reason {
        body["reason"] = json!(r);
      }
      body
    };

    let (status, body) = send(
      &router,
      "PATCH",
      "/attendance/correct",
      Some(correct("Present", None)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "No change. Status already set.");
    assert_eq!(body["record"]["correctionHistory"], json!([]));

    let (status, body) = send(
      &router,
      "PATCH",
      "/attendance/correct",
      Some(correct("Leave", Some("sick"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Attendance corrected successfully.");
    assert_eq!(body["record"]["status"], "Leave");
    let history = body["record"]["correctionHistory"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["fromStatus"], "Present");
    assert_eq!(history[0]["toStatus"], "Leave");
    assert_eq!(history[0]["changedBy"], "admin");
    assert_eq!(history[0]["reason"], "sick");

    // No record for that day yet.
    let (status, _) = send(
      &router,
      "PATCH",
      "/attendance/correct",
      Some(json!({
        "studentId": 17, "date": "2025-04-01", "newStatus": "Absent",
      })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn patch_and_delete_by_id() {
    let (router, _) = seeded().await;
    send(&router, "POST", "/attendance", Some(upsert_body(json!([17]), "Present")))
      .await;
    let (_, body) = send(&router, "GET", "/attendance", None).await;
    let record_id = body["data"][0]["recordId"].as_str().unwrap().to_owned();

    let (status, body) = send(
      &router,
      "PATCH",
      &format!("/attendance/{record_id}"),
      Some(json!({ "teacher": "Mr. Das" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Attendance updated.");
    assert_eq!(body["record"]["teacher"], "Mr. Das");
    assert_eq!(body["record"]["correctionHistory"], json!([]));

    // A status patch audits with the default reason.
    let (status, body) = send(
      &router,
      "PATCH",
      &format!("/attendance/{record_id}"),
      Some(json!({ "status": "Absent", "username": "teacher1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let history = body["record"]["correctionHistory"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["changedBy"], "teacher1");
    assert_eq!(history[0]["reason"], "manual patch");

    let (status, body) =
      send(&router, "DELETE", &format!("/attendance/{record_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Attendance deleted successfully.");

    let (status, _) =
      send(&router, "DELETE", &format!("/attendance/{record_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
      &router,
      "PATCH",
      &format!("/attendance/{}", uuid::Uuid::new_v4()),
      Some(json!({ "teacher": "X" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn list_filters_students_directly_and_indirectly() {
    let (router, students) = seeded().await;
    send(&router, "POST", "/attendance", Some(upsert_body(json!([17, 18]), "Present")))
      .await;

    // Explicit reference wins.
    let (status, body) =
      send(&router, "GET", "/attendance?studentId=17", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["student"]["name"], "Amit Rao");
    assert_eq!(
      body["data"][0]["studentId"],
      students[0].student_id.to_string()
    );

    // Indirect: class filter.
    let (_, body) = send(&router, "GET", "/attendance?className=5A", None).await;
    assert_eq!(body["total"], 2);

    // Indirect filter matching nobody: empty page, not an error.
    let (status, body) =
      send(&router, "GET", "/attendance?className=9Z", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "total": 0, "page": 1, "limit": 50, "data": [] }));

    // Well-formed reference nobody answers to: also an empty page.
    let (status, body) =
      send(&router, "GET", "/attendance?studentId=999", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);

    // Malformed reference is a caller error.
    let (status, _) =
      send(&router, "GET", "/attendance?studentId=amit", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Invalid status is rejected, not silently ignored.
    let (status, _) = send(&router, "GET", "/attendance?status=Sick", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn by_student_name_buckets_into_monday_weeks() {
    let (router, students) = seeded().await;

    let upsert_for = |date: String, day_status: &str| {
      json!({
        "studentIds": [17],
        "className": "5A",
        "teacher": "Ms. Iyer",
        "username": "teacher1",
        "date": date,
        "status": day_status,
      })
    };
    let now = chrono::Utc::now();
    send(
      &router,
      "POST",
      "/attendance",
      Some(upsert_for(now.to_rfc3339(), "Present")),
    )
    .await;
    send(
      &router,
      "POST",
      "/attendance",
      Some(upsert_for(
        (now - chrono::Duration::days(14)).to_rfc3339(),
        "Absent",
      )),
    )
    .await;

    let (status, _) =
      send(&router, "GET", "/attendance/by-student-name", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
      &router,
      "GET",
      "/attendance/by-student-name?name=Nobody",
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Exact name match is case-insensitive; a weeks value below 1 floors
    // to a single bucket.
    let (status, body) = send(
      &router,
      "GET",
      "/attendance/by-student-name?name=amit%20rao&weeks=0",
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
      body["student"]["studentId"],
      students[0].student_id.to_string()
    );
    assert_eq!(body["weeks"].as_array().unwrap().len(), 1);

    // Three weeks back: today's record in the current bucket, the
    // fortnight-old one two buckets later, nothing in between.
    let (_, body) = send(
      &router,
      "GET",
      "/attendance/by-student-name?name=Amit%20Rao&weeks=3",
      None,
    )
    .await;
    let weeks = body["weeks"].as_array().unwrap();
    assert_eq!(weeks.len(), 3);
    assert_eq!(weeks[0]["records"].as_array().unwrap().len(), 1);
    assert_eq!(weeks[0]["records"][0]["status"], "Present");
    assert!(weeks[1]["records"].as_array().unwrap().is_empty());
    assert_eq!(weeks[2]["records"].as_array().unwrap().len(), 1);
    assert_eq!(weeks[2]["records"][0]["status"], "Absent");
  }

  #[tokio::test]
  async fn by_user_is_an_exact_reporter_view() {
    let (router, _) = seeded().await;
    send(&router, "POST", "/attendance", Some(upsert_body(json!([17]), "Present")))
      .await;

    let (status, _) = send(&router, "GET", "/attendance/by-user", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Exact match is case-insensitive.
    let (status, body) =
      send(&router, "GET", "/attendance/by-user?username=TEACHER1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["totalPages"], 1);

    // Oversized page sizes are capped, not honoured.
    let (_, body) = send(
      &router,
      "GET",
      "/attendance/by-user?username=teacher1&limit=9999",
      None,
    )
    .await;
    assert_eq!(body["limit"], 500);

    // Substrings do not match here.
    let (_, body) =
      send(&router, "GET", "/attendance/by-user?username=teacher", None).await;
    assert_eq!(body["total"], 0);

    // dateTo is inclusive of the whole end day.
    let (_, body) = send(
      &router,
      "GET",
      "/attendance/by-user?username=teacher1&dateFrom=2025-03-01&dateTo=2025-03-10",
      None,
    )
    .await;
    assert_eq!(body["total"], 1);

    let (_, body) = send(
      &router,
      "GET",
      "/attendance/by-user?username=teacher1&dateTo=2025-03-09",
      None,
    )
    .await;
    assert_eq!(body["total"], 0);
  }
}
