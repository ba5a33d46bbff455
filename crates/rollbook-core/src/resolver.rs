//! Student reference resolution — mapping ambiguous caller identifiers to
//! canonical directory identities.
//!
//! Three strategies, one seam: single ref, bulk refs, and the indirect
//! class/name fallback. All are read-only against the directory.

use crate::{
  store::RollbookStore,
  student::{Student, StudentRef},
};

/// Resolve one parsed reference.
///
/// `None` means the directory has no such student; callers surface that as
/// `StudentNotFound` at the boundary.
pub async fn resolve_one<S: RollbookStore>(
  store: &S,
  student_ref: StudentRef,
) -> Result<Option<Student>, S::Error> {
  match student_ref {
    StudentRef::Id(id) => store.student_by_id(id).await,
    StudentRef::Roll(n) => store.student_by_roll(n).await,
  }
}

/// Resolve a heterogeneous list of raw identifiers.
///
/// The list is partitioned into UUID-shaped and numeric-shaped values, each
/// partition is looked up in one batch, and the results are unioned. Values
/// that parse as neither are skipped. An empty result is the caller's
/// `NoMatchingStudents`.
pub async fn resolve_many<S: RollbookStore>(
  store: &S,
  raw: &[String],
) -> Result<Vec<Student>, S::Error> {
  let mut ids = Vec::new();
  let mut rolls = Vec::new();
  for value in raw {
    match StudentRef::parse(value) {
      Ok(StudentRef::Id(id)) => ids.push(id),
      Ok(StudentRef::Roll(n)) => rolls.push(n),
      Err(_) => {}
    }
  }

  if ids.is_empty() && rolls.is_empty() {
    return Ok(Vec::new());
  }
  store.students_by_refs(ids, rolls).await
}

/// Indirect resolution by class label and/or name fragment
/// (case-insensitive substring). An empty set is a valid answer — "no
/// matching records" — never an error.
pub async fn resolve_by_class_or_name<S: RollbookStore>(
  store: &S,
  class_name: Option<&str>,
  name: Option<&str>,
) -> Result<Vec<Student>, S::Error> {
  store
    .search_students(class_name.map(str::to_owned), name.map(str::to_owned))
    .await
}
