//! Handlers for the attendance write paths.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/attendance` | Bulk/single upsert keyed on (student, day) |
//! | `PATCH`  | `/attendance/correct` | Correct by student + date, audited |
//! | `PATCH`  | `/attendance/:id` | Partial update; status changes are audited |
//! | `DELETE` | `/attendance/:id` | Permanent removal |
//!
//! All validation happens here, before the store is touched; handlers pass
//! only canonical days and resolved identities downward.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use rollbook_core::{
  Error as CoreError,
  attendance::{AttendanceFacts, AttendancePatch, AttendanceStatus},
  day::DayRange,
  resolver,
  store::RollbookStore,
  student::{Student, StudentRef},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Shared input shapes ─────────────────────────────────────────────────────

/// A student reference as it arrives on the wire: clients send roll numbers
/// as JSON numbers or strings interchangeably, and internal ids as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawRef {
  Num(i64),
  Str(String),
}

impl RawRef {
  pub fn into_string(self) -> String {
    match self {
      Self::Num(n) => n.to_string(),
      Self::Str(s) => s,
    }
  }
}

/// Parse, then resolve, a single required student reference.
async fn resolve_required_student<S>(
  store: &S,
  raw: &str,
) -> Result<Student, ApiError>
where
  S: RollbookStore,
{
  let student_ref = StudentRef::parse(raw).map_err(ApiError::from)?;
  resolver::resolve_one(store, student_ref)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| {
      ApiError::from(CoreError::StudentNotFound(raw.to_owned()))
    })
}

fn parse_status(raw: &str) -> Result<AttendanceStatus, ApiError> {
  Ok(AttendanceStatus::parse(raw)?)
}

fn parse_day(raw: &str) -> Result<DayRange, ApiError> {
  Ok(DayRange::parse(raw)?)
}

// ─── Upsert ──────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /attendance`. Exactly one of `studentId` /
/// `studentIds` selects the target set.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertBody {
  pub student_id:  Option<RawRef>,
  pub student_ids: Option<Vec<RawRef>>,
  pub class_name:  Option<String>,
  pub teacher:     Option<String>,
  pub username:    Option<String>,
  pub date:        Option<String>,
  pub status:      Option<String>,
}

/// `POST /attendance` — idempotent single/bulk upsert.
///
/// Returns `{message, created, updated}`. Within a bulk batch partial
/// success is reported in the counts, never as a whole-batch failure.
pub async fn upsert<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<UpsertBody>,
) -> Result<Json<Value>, ApiError>
where
  S: RollbookStore,
{
  let (Some(class_name), Some(teacher), Some(username), Some(date), Some(status)) = (
    body.class_name,
    body.teacher,
    body.username,
    body.date,
    body.status,
  ) else {
    return Err(
      CoreError::MissingRequiredField(
        "className, teacher, username, date, status".to_owned(),
      )
      .into(),
    );
  };
  let status = parse_status(&status)?;

  let student_ids: Vec<Uuid> = match (body.student_ids, body.student_id) {
    (Some(refs), _) if !refs.is_empty() => {
      let raw: Vec<String> =
        refs.into_iter().map(RawRef::into_string).collect();
      let students = resolver::resolve_many(store.as_ref(), &raw)
        .await
        .map_err(ApiError::from_store)?;
      if students.is_empty() {
        return Err(CoreError::NoMatchingStudents.into());
      }
      students.into_iter().map(|s| s.student_id).collect()
    }
    (_, Some(raw)) => {
      let student =
        resolve_required_student(store.as_ref(), &raw.into_string()).await?;
      vec![student.student_id]
    }
    _ => {
      return Err(ApiError::BadRequest(
        "provide studentId or studentIds".to_owned(),
      ));
    }
  };

  let day = parse_day(&date)?;
  let outcome = store
    .upsert_attendance(student_ids, day.start, AttendanceFacts {
      class_name,
      teacher,
      username,
      status,
    })
    .await
    .map_err(ApiError::from_store)?;

  Ok(Json(json!({
    "message": "Attendance saved.",
    "created": outcome.created,
    "updated": outcome.updated,
  })))
}

// ─── Correct by key ──────────────────────────────────────────────────────────

/// JSON body accepted by `PATCH /attendance/correct`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectBody {
  pub student_id:   Option<RawRef>,
  pub date:         Option<String>,
  pub new_status:   Option<String>,
  pub reason:       Option<String>,
  pub corrected_by: Option<String>,
  pub username:     Option<String>,
}

/// `PATCH /attendance/correct` — correct the record for (student, day).
///
/// Idempotent: correcting to the current status changes nothing and appends
/// no audit entry.
pub async fn correct<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<CorrectBody>,
) -> Result<Json<Value>, ApiError>
where
  S: RollbookStore,
{
  let (Some(student_id), Some(date), Some(new_status)) =
    (body.student_id, body.date, body.new_status)
  else {
    return Err(
      CoreError::MissingRequiredField("studentId, date, newStatus".to_owned())
        .into(),
    );
  };
  let new_status = parse_status(&new_status)?;

  let student =
    resolve_required_student(store.as_ref(), &student_id.into_string())
      .await?;
  let day = parse_day(&date)?;

  let changed_by = body
    .corrected_by
    .or(body.username)
    .unwrap_or_else(|| "system".to_owned());
  let reason = body
    .reason
    .unwrap_or_else(|| "manual correction".to_owned());

  let (record, changed) = store
    .correct_attendance(student.student_id, day.start, new_status, changed_by, reason)
    .await
    .map_err(ApiError::from_store)?;

  let message = if changed {
    "Attendance corrected successfully."
  } else {
    "No change. Status already set."
  };
  Ok(Json(json!({ "message": message, "record": record })))
}

// ─── Partial update ──────────────────────────────────────────────────────────

/// JSON body accepted by `PATCH /attendance/:id`. All fields optional;
/// `correctedBy`/`reason` only feed the audit entry of a status change.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchBody {
  pub status:       Option<String>,
  pub date:         Option<String>,
  pub teacher:      Option<String>,
  pub username:     Option<String>,
  pub class_name:   Option<String>,
  pub corrected_by: Option<String>,
  pub reason:       Option<String>,
}

/// `PATCH /attendance/:id` — partial update by record id.
pub async fn update_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<PatchBody>,
) -> Result<Json<Value>, ApiError>
where
  S: RollbookStore,
{
  let status = body.status.as_deref().map(parse_status).transpose()?;
  let day = body
    .date
    .as_deref()
    .map(parse_day)
    .transpose()?
    .map(|range| range.start);

  let patch = AttendancePatch {
    status,
    day,
    teacher: body.teacher,
    username: body.username,
    class_name: body.class_name,
    corrected_by: body.corrected_by,
    reason: body.reason,
  };

  let record = store
    .update_attendance(id, patch)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(json!({ "message": "Attendance updated.", "record": record })))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /attendance/:id` — permanent removal, no soft delete.
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError>
where
  S: RollbookStore,
{
  let deleted = store
    .delete_attendance(id)
    .await
    .map_err(ApiError::from_store)?;
  if !deleted {
    return Err(CoreError::RecordNotFound(id.to_string()).into());
  }
  Ok(Json(json!({ "message": "Attendance deleted successfully." })))
}
