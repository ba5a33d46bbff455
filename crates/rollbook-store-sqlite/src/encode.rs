//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings (canonical day instants
//! included, so string comparison orders chronologically). The correction
//! history is stored as compact JSON. UUIDs are stored as hyphenated
//! lowercase strings.

use chrono::{DateTime, Utc};
use rollbook_core::{
  attendance::{AttendanceRecord, AttendanceStatus, CorrectionEntry},
  student::{Student, StudentSummary},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String {
  id.hyphenated().to_string()
}

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Ok(Uuid::parse_str(s)?)
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339()
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── AttendanceStatus ────────────────────────────────────────────────────────

pub fn encode_status(s: AttendanceStatus) -> &'static str {
  s.as_str()
}

pub fn decode_status(s: &str) -> Result<AttendanceStatus> {
  Ok(AttendanceStatus::parse(s)?)
}

// ─── Correction history ──────────────────────────────────────────────────────

pub fn encode_history(entries: &[CorrectionEntry]) -> Result<String> {
  Ok(serde_json::to_string(entries)?)
}

pub fn decode_history(s: &str) -> Result<Vec<CorrectionEntry>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `students` row.
pub struct RawStudent {
  pub student_id:  String,
  pub roll_number: i64,
  pub name:        String,
  pub class_name:  String,
  pub mobile:      Option<String>,
  pub email:       Option<String>,
  pub created_at:  String,
}

impl RawStudent {
  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      student_id:  decode_uuid(&self.student_id)?,
      roll_number: self.roll_number,
      name:        self.name,
      class_name:  self.class_name,
      mobile:      self.mobile,
      email:       self.email,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `attendance` row, optionally joined
/// with the student's display columns.
pub struct RawAttendance {
  pub record_id:          String,
  pub student_id:         String,
  pub class_name:         String,
  pub teacher:            String,
  pub username:           String,
  pub day:                String,
  pub status:             String,
  pub correction_history: String,
  pub created_at:         String,
  pub updated_at:         String,
  // students join (list rows only)
  pub student_name:       Option<String>,
  pub student_class:      Option<String>,
  pub student_roll:       Option<i64>,
}

impl RawAttendance {
  pub fn into_record(self) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
      record_id:          decode_uuid(&self.record_id)?,
      student_id:         decode_uuid(&self.student_id)?,
      class_name:         self.class_name,
      teacher:            self.teacher,
      username:           self.username,
      day:                decode_dt(&self.day)?,
      status:             decode_status(&self.status)?,
      correction_history: decode_history(&self.correction_history)?,
      created_at:         decode_dt(&self.created_at)?,
      updated_at:         decode_dt(&self.updated_at)?,
    })
  }

  /// The joined student summary, when the join matched.
  pub fn student_summary(&self) -> Option<StudentSummary> {
    match (&self.student_name, &self.student_class, self.student_roll) {
      (Some(name), Some(class_name), Some(roll_number)) => {
        Some(StudentSummary {
          name:        name.clone(),
          class_name:  class_name.clone(),
          roll_number,
        })
      }
      _ => None,
    }
  }
}
