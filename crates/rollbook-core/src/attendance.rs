//! Attendance record types — one fact per (student, calendar day).
//!
//! A record is created on the first report for its natural key and mutated
//! only by corrections or partial field updates. The correction history is
//! embedded and append-only; entries are never edited or removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, student::StudentSummary};

// ─── Status ──────────────────────────────────────────────────────────────────

/// The fixed status enum. Wire strings are the capitalised variant names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
  Present,
  Absent,
  Leave,
}

impl AttendanceStatus {
  /// The string stored in the `status` column.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Present => "Present",
      Self::Absent => "Absent",
      Self::Leave => "Leave",
    }
  }

  /// Parse a wire/database value; anything outside the enum is rejected.
  pub fn parse(raw: &str) -> Result<Self> {
    match raw {
      "Present" => Ok(Self::Present),
      "Absent" => Ok(Self::Absent),
      "Leave" => Ok(Self::Leave),
      other => Err(Error::InvalidStatus(other.to_owned())),
    }
  }
}

// ─── Correction history ──────────────────────────────────────────────────────

/// An immutable audit entry appended when a record's status changes after
/// creation. Appended in chronological order, only on an actual change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionEntry {
  pub changed_at:  DateTime<Utc>,
  /// Username of the actor, or `"system"`.
  pub changed_by:  String,
  pub from_status: AttendanceStatus,
  pub to_status:   AttendanceStatus,
  pub reason:      String,
}

// ─── AttendanceRecord ────────────────────────────────────────────────────────

/// One attendance fact. Exactly one record exists per (student, day);
/// `day` is always a UTC-midnight instant (see [`crate::day::DayRange`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
  pub record_id:          Uuid,
  /// Canonical key half: the internal student identity, copied by value.
  pub student_id:         Uuid,
  pub class_name:         String,
  /// Display name of the reporting teacher.
  pub teacher:            String,
  /// Audit actor: the reporting account's username.
  pub username:           String,
  /// Canonical key half: the UTC-midnight day instant.
  pub day:                DateTime<Utc>,
  pub status:             AttendanceStatus,
  pub correction_history: Vec<CorrectionEntry>,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
}

impl AttendanceRecord {
  /// Apply a status correction in place.
  ///
  /// Returns `None` without touching the record when `new_status` equals
  /// the current status — a no-op correction must not append a vacuous
  /// history entry. Otherwise sets the status, appends exactly one entry,
  /// bumps `updated_at`, and returns the entry.
  pub fn apply_correction(
    &mut self,
    new_status: AttendanceStatus,
    changed_by: &str,
    reason: &str,
    now: DateTime<Utc>,
  ) -> Option<&CorrectionEntry> {
    if self.status == new_status {
      return None;
    }

    let entry = CorrectionEntry {
      changed_at:  now,
      changed_by:  changed_by.to_owned(),
      from_status: self.status,
      to_status:   new_status,
      reason:      reason.to_owned(),
    };
    self.status = new_status;
    self.updated_at = now;
    self.correction_history.push(entry);
    self.correction_history.last()
  }
}

// ─── Write inputs ────────────────────────────────────────────────────────────

/// The mutable fields written by an upsert — everything except the natural
/// key. Validated before any write is attempted.
#[derive(Debug, Clone)]
pub struct AttendanceFacts {
  pub class_name: String,
  pub teacher:    String,
  pub username:   String,
  pub status:     AttendanceStatus,
}

/// A partial update for the patch-by-id path. `None` fields are untouched.
#[derive(Debug, Clone, Default)]
pub struct AttendancePatch {
  pub status:       Option<AttendanceStatus>,
  /// Already normalised to a UTC-midnight instant by the caller.
  pub day:          Option<DateTime<Utc>>,
  pub teacher:      Option<String>,
  pub username:     Option<String>,
  pub class_name:   Option<String>,
  /// Audit actor for a status change; falls back to the patch username,
  /// then to `"system"`.
  pub corrected_by: Option<String>,
  /// Audit reason for a status change; defaults to `"manual patch"`.
  pub reason:       Option<String>,
}

impl AttendancePatch {
  pub fn is_empty(&self) -> bool {
    self.status.is_none()
      && self.day.is_none()
      && self.teacher.is_none()
      && self.username.is_none()
      && self.class_name.is_none()
  }

  /// The audit actor recorded if this patch changes the status.
  pub fn audit_actor(&self) -> &str {
    self
      .corrected_by
      .as_deref()
      .or(self.username.as_deref())
      .unwrap_or("system")
  }

  /// The audit reason recorded if this patch changes the status.
  pub fn audit_reason(&self) -> &str {
    self.reason.as_deref().unwrap_or("manual patch")
  }
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// Created/updated counts from a bulk upsert. Only keys actually written
/// are counted; within a bulk batch partial success is the contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
  pub created: u64,
  pub updated: u64,
}

/// A list row: the record plus the joined student display attributes.
/// The join is by copied key; a deleted student leaves `student` empty.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRow {
  #[serde(flatten)]
  pub record:  AttendanceRecord,
  pub student: Option<StudentSummary>,
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn record(status: AttendanceStatus) -> AttendanceRecord {
    let day = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
    AttendanceRecord {
      record_id: Uuid::new_v4(),
      student_id: Uuid::new_v4(),
      class_name: "5A".into(),
      teacher: "T1".into(),
      username: "u1".into(),
      day,
      status,
      correction_history: Vec::new(),
      created_at: day,
      updated_at: day,
    }
  }

  #[test]
  fn status_strings_round_trip_and_reject_strangers() {
    for status in [
      AttendanceStatus::Present,
      AttendanceStatus::Absent,
      AttendanceStatus::Leave,
    ] {
      assert_eq!(AttendanceStatus::parse(status.as_str()).unwrap(), status);
    }
    assert!(matches!(
      AttendanceStatus::parse("Sick"),
      Err(Error::InvalidStatus(_))
    ));
    // Matching is case-sensitive, like the original enum.
    assert!(AttendanceStatus::parse("present").is_err());
  }

  #[test]
  fn same_status_correction_is_a_no_op() {
    let mut rec = record(AttendanceStatus::Present);
    let before = rec.updated_at;
    let appended = rec.apply_correction(
      AttendanceStatus::Present,
      "u1",
      "whatever",
      Utc::now(),
    );
    assert!(appended.is_none());
    assert!(rec.correction_history.is_empty());
    assert_eq!(rec.updated_at, before);
  }

  #[test]
  fn status_change_appends_exactly_one_entry() {
    let mut rec = record(AttendanceStatus::Present);
    let now = Utc::now();
    rec
      .apply_correction(AttendanceStatus::Leave, "admin", "sick", now)
      .expect("entry appended");

    assert_eq!(rec.status, AttendanceStatus::Leave);
    assert_eq!(rec.correction_history.len(), 1);
    let entry = &rec.correction_history[0];
    assert_eq!(entry.from_status, AttendanceStatus::Present);
    assert_eq!(entry.to_status, AttendanceStatus::Leave);
    assert_eq!(entry.changed_by, "admin");
    assert_eq!(entry.reason, "sick");
    assert_eq!(rec.updated_at, now);
  }

  #[test]
  fn patch_audit_defaults() {
    let patch = AttendancePatch::default();
    assert_eq!(patch.audit_actor(), "system");
    assert_eq!(patch.audit_reason(), "manual patch");

    let patch = AttendancePatch {
      username: Some("u2".into()),
      ..Default::default()
    };
    assert_eq!(patch.audit_actor(), "u2");

    let patch = AttendancePatch {
      username: Some("u2".into()),
      corrected_by: Some("admin".into()),
      reason: Some("typo".into()),
      ..Default::default()
    };
    assert_eq!(patch.audit_actor(), "admin");
    assert_eq!(patch.audit_reason(), "typo");
  }
}
