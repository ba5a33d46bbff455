//! The `RollbookStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `rollbook-store-sqlite`). Higher layers (`rollbook-api`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  attendance::{
    AttendanceFacts, AttendancePatch, AttendanceRecord, AttendanceRow,
    AttendanceStatus, UpsertOutcome,
  },
  student::{NewStudent, Student},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`RollbookStore::list_attendance`].
///
/// Student resolution (explicit ref vs class/name fallback) happens before
/// this struct is built; by the time it reaches the store, the student
/// filter is a plain identity set.
#[derive(Debug, Clone, Default)]
pub struct AttendanceQuery {
  /// Case-insensitive substring match on the reporting username.
  pub username:       Option<String>,
  /// Case-insensitive exact match on the reporting username. Used by the
  /// per-reporter view; combines with `username` as AND if both are set.
  pub username_exact: Option<String>,
  pub status:         Option<AttendanceStatus>,
  /// Half-open day filter: `day_from <= day < day_to`.
  pub day_from:       Option<DateTime<Utc>>,
  pub day_to:         Option<DateTime<Utc>>,
  /// Membership filter over resolved student identities. `None` means no
  /// student filter; an empty set should be short-circuited by the caller.
  pub student_ids:    Option<Vec<Uuid>>,
  /// 1-indexed page number; floored at 1.
  pub page:           u32,
  /// Page size; floored at 1.
  pub limit:          u32,
}

impl AttendanceQuery {
  pub fn page_number(&self) -> u32 {
    self.page.max(1)
  }

  pub fn page_size(&self) -> u32 {
    self.limit.max(1)
  }

  /// Rows to skip: `(page - 1) * limit`, both floored at 1.
  pub fn skip(&self) -> u64 {
    u64::from(self.page_number() - 1) * u64::from(self.page_size())
  }
}

/// A paginated result set — mirrors the wire shape
/// `{total, page, limit, data}`.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
  pub total: u64,
  pub page:  u32,
  pub limit: u32,
  pub data:  Vec<T>,
}

impl<T> Page<T> {
  /// The empty page returned when an indirect student filter matches
  /// nobody — "no matching records", never an error.
  pub fn empty(page: u32, limit: u32) -> Self {
    Self {
      total: 0,
      page:  page.max(1),
      limit: limit.max(1),
      data:  Vec::new(),
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the attendance store and the student directory it
/// resolves against.
///
/// All operations are request-scoped and stateless between requests; the
/// backing store's `(student, day)` uniqueness constraint is the sole
/// synchronization point. No method holds a lock across multiple store
/// round-trips, so resolve-then-write flows re-validate by natural key at
/// write time.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RollbookStore: Send + Sync {
  type Error: std::error::Error
    + Into<crate::Error>
    + Send
    + Sync
    + 'static;

  // ── Student directory ─────────────────────────────────────────────────

  /// Enrollment hook: create and persist a student. Fails when the roll
  /// number is already taken.
  fn add_student(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  /// Lookup by internal identity. Returns `None` if not found.
  fn student_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  /// Lookup by external roll number. Returns `None` if not found.
  fn student_by_roll(
    &self,
    roll: i64,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  /// Lookup by exact, case-insensitive display name. When several students
  /// share a name an arbitrary one is returned.
  fn student_by_name(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  /// Batch lookup: the union of id matches and roll matches, deduplicated.
  fn students_by_refs(
    &self,
    ids: Vec<Uuid>,
    rolls: Vec<i64>,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + '_;

  /// Filtered search by exact class label and/or case-insensitive name
  /// fragment. An empty result is a valid answer, not an error.
  fn search_students(
    &self,
    class_name: Option<String>,
    name: Option<String>,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + '_;

  // ── Attendance ────────────────────────────────────────────────────────

  /// Idempotent bulk upsert keyed on (student, day): overwrite the mutable
  /// fields where a record exists, create it where it doesn't. Issued as an
  /// unordered batch — one key's failure must not block the rest, and the
  /// returned counts reflect only keys actually written.
  fn upsert_attendance(
    &self,
    student_ids: Vec<Uuid>,
    day: DateTime<Utc>,
    facts: AttendanceFacts,
  ) -> impl Future<Output = Result<UpsertOutcome, Self::Error>> + Send + '_;

  /// Retrieve a record by surrogate id. Returns `None` if not found.
  fn attendance_by_id(
    &self,
    record_id: Uuid,
  ) -> impl Future<Output = Result<Option<AttendanceRecord>, Self::Error>> + Send + '_;

  /// Retrieve the single record for a natural key. `day` must already be a
  /// canonical UTC-midnight instant.
  fn attendance_by_key(
    &self,
    student_id: Uuid,
    day: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<AttendanceRecord>, Self::Error>> + Send + '_;

  /// One student's records in a half-open day interval, oldest first.
  /// Backs the weekly per-student view.
  fn attendance_for_student_between(
    &self,
    student_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + '_;

  /// Filtered, paginated listing sorted by day descending with a
  /// deterministic tie-break, most recent first.
  fn list_attendance(
    &self,
    query: AttendanceQuery,
  ) -> impl Future<Output = Result<Page<AttendanceRow>, Self::Error>> + Send + '_;

  /// Correct the record for (student, day). A no-op when the status is
  /// unchanged; otherwise appends exactly one correction entry. Returns the
  /// record and whether anything changed. Fails when no record exists for
  /// the key.
  fn correct_attendance(
    &self,
    student_id: Uuid,
    day: DateTime<Utc>,
    new_status: AttendanceStatus,
    changed_by: String,
    reason: String,
  ) -> impl Future<Output = Result<(AttendanceRecord, bool), Self::Error>> + Send + '_;

  /// Partial update by record id. A status change appends a correction
  /// entry (reason defaulted by the patch); other fields never do. Fails
  /// when the record does not exist.
  fn update_attendance(
    &self,
    record_id: Uuid,
    patch: AttendancePatch,
  ) -> impl Future<Output = Result<AttendanceRecord, Self::Error>> + Send + '_;

  /// Permanently remove a record — an explicit administrative action, not
  /// a soft delete. Returns `false` when the record was absent.
  fn delete_attendance(
    &self,
    record_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
