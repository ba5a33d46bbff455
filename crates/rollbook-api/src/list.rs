//! Handlers for the attendance read paths.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/attendance` | Filtered, paginated listing |
//! | `GET` | `/attendance/by-user` | Per-reporter view, `?username` required |
//! | `GET` | `/attendance/by-student-name` | Weekly per-student view, `?name` required |
//!
//! Student filter precedence on `/attendance`: an explicit `student` /
//! `studentId` reference wins; otherwise `className`/`name` select an
//! identity set; otherwise no student filter. An indirect filter that
//! matches nobody is answered with an empty page, never an error.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::{DateTime, Duration, Utc};
use rollbook_core::{
  Error as CoreError,
  attendance::{AttendanceRecord, AttendanceRow, AttendanceStatus},
  day::DayRange,
  resolver,
  store::{AttendanceQuery, Page, RollbookStore},
  student::StudentRef,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::ApiError;

/// Hard ceiling on page size for the reporter view.
const MAX_LIMIT: u32 = 500;

/// Hard ceiling on the weekly view's lookback.
const MAX_WEEKS: u32 = 52;

fn default_page() -> u32 {
  1
}

fn default_limit() -> u32 {
  50
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
  /// Exact class label; selects students indirectly.
  pub class_name: Option<String>,
  /// Case-insensitive name fragment; selects students indirectly.
  pub name:       Option<String>,
  /// Case-insensitive substring match on the reporting username.
  pub username:   Option<String>,
  /// Explicit student reference (internal id or roll number).
  pub student:    Option<String>,
  /// Alias for `student`; `student` wins when both are present.
  pub student_id: Option<String>,
  /// A single calendar day, any accepted date shape.
  pub date:       Option<String>,
  pub status:     Option<String>,
  #[serde(default = "default_page")]
  pub page:       u32,
  #[serde(default = "default_limit")]
  pub limit:      u32,
}

/// `GET /attendance` — filtered, paginated listing, most recent day first.
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Page<AttendanceRow>>, ApiError>
where
  S: RollbookStore,
{
  let status = params
    .status
    .as_deref()
    .map(AttendanceStatus::parse)
    .transpose()?;

  let (day_from, day_to) = match params.date.as_deref() {
    Some(raw) => {
      let range = DayRange::parse(raw)?;
      (Some(range.start), Some(range.end))
    }
    None => (None, None),
  };

  // Student filter precedence: explicit ref, then class/name, then none.
  let explicit_ref = params
    .student
    .as_deref()
    .or(params.student_id.as_deref())
    .map(str::trim)
    .filter(|s| !s.is_empty());

  let student_ids: Option<Vec<Uuid>> = if let Some(raw) = explicit_ref {
    let student_ref = StudentRef::parse(raw)?;
    match resolver::resolve_one(store.as_ref(), student_ref)
      .await
      .map_err(ApiError::from_store)?
    {
      Some(student) => Some(vec![student.student_id]),
      // A well-formed reference nobody answers to: no matching records.
      None => return Ok(Json(Page::empty(params.page, params.limit))),
    }
  } else if params.class_name.is_some() || params.name.is_some() {
    let students = resolver::resolve_by_class_or_name(
      store.as_ref(),
      params.class_name.as_deref(),
      params.name.as_deref(),
    )
    .await
    .map_err(ApiError::from_store)?;
    if students.is_empty() {
      return Ok(Json(Page::empty(params.page, params.limit)));
    }
    Some(students.into_iter().map(|s| s.student_id).collect())
  } else {
    None
  };

  let page = store
    .list_attendance(AttendanceQuery {
      username: params.username,
      username_exact: None,
      status,
      day_from,
      day_to,
      student_ids,
      page: params.page,
      limit: params.limit,
    })
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(page))
}

// ─── By reporter ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByUserParams {
  pub username:  Option<String>,
  pub status:    Option<String>,
  /// Inclusive start day.
  pub date_from: Option<String>,
  /// Inclusive end day (the whole day counts).
  pub date_to:   Option<String>,
  #[serde(default = "default_page")]
  pub page:      u32,
  #[serde(default = "default_limit")]
  pub limit:     u32,
}

/// `GET /attendance/by-user` — everything one reporter recorded,
/// case-insensitive exact username match. `limit` is capped at
/// [`MAX_LIMIT`]; the payload carries a `totalPages` count.
pub async fn by_user<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ByUserParams>,
) -> Result<Json<Value>, ApiError>
where
  S: RollbookStore,
{
  let username = params
    .username
    .as_deref()
    .map(str::trim)
    .filter(|u| !u.is_empty())
    .ok_or_else(|| CoreError::MissingRequiredField("username".to_owned()))?
    .to_owned();

  let status = params
    .status
    .as_deref()
    .map(AttendanceStatus::parse)
    .transpose()?;
  let day_from = params
    .date_from
    .as_deref()
    .map(DayRange::parse)
    .transpose()?
    .map(|range| range.start);
  let day_to = params
    .date_to
    .as_deref()
    .map(DayRange::parse)
    .transpose()?
    .map(|range| range.end);

  let page = store
    .list_attendance(AttendanceQuery {
      username: None,
      username_exact: Some(username),
      status,
      day_from,
      day_to,
      student_ids: None,
      page: params.page,
      limit: params.limit.min(MAX_LIMIT),
    })
    .await
    .map_err(ApiError::from_store)?;

  let total_pages = page.total.div_ceil(u64::from(page.limit));
  Ok(Json(json!({
    "total": page.total,
    "page": page.page,
    "limit": page.limit,
    "totalPages": total_pages,
    "data": page.data,
  })))
}

// ─── By student name ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByStudentNameParams {
  /// Exact student name, matched case-insensitively.
  pub name:  Option<String>,
  /// How many weeks to look back, counting the current one. 1..=52.
  pub weeks: Option<u32>,
}

/// One Monday-aligned UTC week of a student's records, oldest first.
/// `weekEnd` is the exclusive bound of the half-open interval.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekBucket {
  pub week_start: DateTime<Utc>,
  pub week_end:   DateTime<Utc>,
  pub records:    Vec<AttendanceRecord>,
}

/// `GET /attendance/by-student-name` — resolve a student by exact
/// case-insensitive name, then return their attendance grouped into weekly
/// buckets walking backwards from the current week.
pub async fn by_student_name<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ByStudentNameParams>,
) -> Result<Json<Value>, ApiError>
where
  S: RollbookStore,
{
  let name = params
    .name
    .as_deref()
    .map(str::trim)
    .filter(|n| !n.is_empty())
    .ok_or_else(|| CoreError::MissingRequiredField("name".to_owned()))?
    .to_owned();
  let weeks = params.weeks.unwrap_or(1).clamp(1, MAX_WEEKS);

  let student = store
    .student_by_name(name.clone())
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::from(CoreError::StudentNotFound(name)))?;

  let (this_week_start, _) = DayRange::week_of(Utc::now());
  let mut buckets = Vec::with_capacity(weeks as usize);
  for i in 0..i64::from(weeks) {
    let week_start = this_week_start - Duration::weeks(i);
    let week_end = week_start + Duration::weeks(1);
    let records = store
      .attendance_for_student_between(student.student_id, week_start, week_end)
      .await
      .map_err(ApiError::from_store)?;
    buckets.push(WeekBucket { week_start, week_end, records });
  }

  Ok(Json(json!({ "student": student, "weeks": buckets })))
}
