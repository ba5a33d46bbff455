//! Student identity and the caller-facing reference shapes.
//!
//! Students are created by enrollment (an external collaborator writing
//! through [`crate::store::RollbookStore::add_student`]) and are read-only
//! from the attendance core's perspective.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── StudentRef ──────────────────────────────────────────────────────────────

/// A caller-supplied student reference: either the internal identity or the
/// school-administration roll number. One tagged union, one resolver — never
/// ad hoc parsing at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentRef {
  /// Internal system-generated identity.
  Id(Uuid),
  /// External numeric roll number, unique across the directory.
  Roll(i64),
}

impl StudentRef {
  /// Parse a raw identifier. UUID-shaped values win; anything else must be
  /// a whole number.
  pub fn parse(raw: &str) -> Result<Self> {
    let raw = raw.trim();
    if let Ok(id) = Uuid::parse_str(raw) {
      return Ok(Self::Id(id));
    }
    if let Ok(n) = raw.parse::<i64>() {
      return Ok(Self::Roll(n));
    }
    Err(Error::InvalidIdentifier(raw.to_owned()))
  }
}

// ─── Student ─────────────────────────────────────────────────────────────────

/// A person in the student directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
  pub student_id:  Uuid,
  /// Assigned by school administration; at most one student per number.
  pub roll_number: i64,
  pub name:        String,
  /// Class/section label, e.g. `"5A"`.
  pub class_name:  String,
  pub mobile:      Option<String>,
  pub email:       Option<String>,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::RollbookStore::add_student`].
/// `student_id` and `created_at` are always assigned by the store.
#[derive(Debug, Clone)]
pub struct NewStudent {
  pub roll_number: i64,
  pub name:        String,
  pub class_name:  String,
  pub mobile:      Option<String>,
  pub email:       Option<String>,
}

/// The display attributes joined onto attendance list rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
  pub name:        String,
  pub class_name:  String,
  pub roll_number: i64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn uuid_shaped_values_parse_as_internal_ids() {
    let id = Uuid::new_v4();
    assert_eq!(
      StudentRef::parse(&id.to_string()).unwrap(),
      StudentRef::Id(id)
    );
  }

  #[test]
  fn numeric_values_parse_as_roll_numbers() {
    assert_eq!(StudentRef::parse("42").unwrap(), StudentRef::Roll(42));
    assert_eq!(StudentRef::parse(" 107 ").unwrap(), StudentRef::Roll(107));
  }

  #[test]
  fn other_values_are_invalid_identifiers() {
    for raw in ["", "alice", "5A", "42.5"] {
      assert!(matches!(
        StudentRef::parse(raw),
        Err(Error::InvalidIdentifier(_))
      ), "raw {raw:?}");
    }
  }
}
