//! [`SqliteStore`] — the SQLite implementation of [`RollbookStore`].

use std::{collections::HashSet, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use rollbook_core::{
  attendance::{
    AttendanceFacts, AttendancePatch, AttendanceRecord, AttendanceRow,
    AttendanceStatus, UpsertOutcome,
  },
  store::{AttendanceQuery, Page, RollbookStore},
  student::{NewStudent, Student},
};

use crate::{
  Error, Result,
  encode::{
    RawAttendance, RawStudent, encode_dt, encode_history, encode_status,
    encode_uuid,
  },
  schema::SCHEMA,
};

const STUDENT_COLS: &str =
  "student_id, roll_number, name, class_name, mobile, email, created_at";

const ATTENDANCE_COLS: &str =
  "record_id, student_id, class_name, teacher, username, day, status, \
   correction_history, created_at, updated_at";

fn read_student(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawStudent> {
  Ok(RawStudent {
    student_id:  row.get(0)?,
    roll_number: row.get(1)?,
    name:        row.get(2)?,
    class_name:  row.get(3)?,
    mobile:      row.get(4)?,
    email:       row.get(5)?,
    created_at:  row.get(6)?,
  })
}

fn read_attendance(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAttendance> {
  Ok(RawAttendance {
    record_id:          row.get(0)?,
    student_id:         row.get(1)?,
    class_name:         row.get(2)?,
    teacher:            row.get(3)?,
    username:           row.get(4)?,
    day:                row.get(5)?,
    status:             row.get(6)?,
    correction_history: row.get(7)?,
    created_at:         row.get(8)?,
    updated_at:         row.get(9)?,
    student_name:       None,
    student_class:      None,
    student_roll:       None,
  })
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A rollbook store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Write back the mutable columns of `record` (status, day, field edits,
  /// correction history). A `(student, day)` collision — possible when a
  /// patch moves a record onto an occupied day — surfaces as
  /// `DuplicateRecord` rather than a bare database error.
  async fn persist_record(&self, record: &AttendanceRecord) -> Result<()> {
    let id       = encode_uuid(record.record_id);
    let class    = record.class_name.clone();
    let teacher  = record.teacher.clone();
    let username = record.username.clone();
    let day      = encode_dt(record.day);
    let status   = encode_status(record.status).to_owned();
    let history  = encode_history(&record.correction_history)?;
    let updated  = encode_dt(record.updated_at);

    let res: std::result::Result<usize, rusqlite::Error> = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE attendance SET
             class_name = ?1, teacher = ?2, username = ?3, day = ?4,
             status = ?5, correction_history = ?6, updated_at = ?7
           WHERE record_id = ?8",
          rusqlite::params![
            class, teacher, username, day, status, history, updated, id
          ],
        ))
      })
      .await?;

    match res {
      Ok(_) => Ok(()),
      Err(e) if is_constraint_violation(&e) => {
        Err(Error::Core(rollbook_core::Error::DuplicateRecord(format!(
          "student {} on {}",
          record.student_id,
          record.day.date_naive()
        ))))
      }
      Err(e) => Err(tokio_rusqlite::Error::Rusqlite(e).into()),
    }
  }
}

// ─── RollbookStore impl ──────────────────────────────────────────────────────

impl RollbookStore for SqliteStore {
  type Error = Error;

  // ── Student directory ─────────────────────────────────────────────────────

  async fn add_student(&self, input: NewStudent) -> Result<Student> {
    let student = Student {
      student_id:  Uuid::new_v4(),
      roll_number: input.roll_number,
      name:        input.name,
      class_name:  input.class_name,
      mobile:      input.mobile,
      email:       input.email,
      created_at:  Utc::now(),
    };

    let id_str = encode_uuid(student.student_id);
    let at_str = encode_dt(student.created_at);
    let roll   = student.roll_number;
    let name   = student.name.clone();
    let class  = student.class_name.clone();
    let mobile = student.mobile.clone();
    let email  = student.email.clone();

    let res: std::result::Result<usize, rusqlite::Error> = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO students
             (student_id, roll_number, name, class_name, mobile, email, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, roll, name, class, mobile, email, at_str],
        ))
      })
      .await?;

    match res {
      Ok(_) => Ok(student),
      Err(e) if is_constraint_violation(&e) => Err(Error::RollNumberTaken(roll)),
      Err(e) => Err(tokio_rusqlite::Error::Rusqlite(e).into()),
    }
  }

  async fn student_by_id(&self, id: Uuid) -> Result<Option<Student>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {STUDENT_COLS} FROM students WHERE student_id = ?1"),
              rusqlite::params![id_str],
              read_student,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  async fn student_by_roll(&self, roll: i64) -> Result<Option<Student>> {
    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {STUDENT_COLS} FROM students WHERE roll_number = ?1"),
              rusqlite::params![roll],
              read_student,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  async fn student_by_name(&self, name: String) -> Result<Option<Student>> {
    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {STUDENT_COLS} FROM students
                 WHERE LOWER(name) = LOWER(?1) LIMIT 1"
              ),
              rusqlite::params![name],
              read_student,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  async fn students_by_refs(
    &self,
    ids: Vec<Uuid>,
    rolls: Vec<i64>,
  ) -> Result<Vec<Student>> {
    let id_strs: Vec<String> = ids.into_iter().map(encode_uuid).collect();

    let raws: Vec<RawStudent> = self
      .conn
      .call(move |conn| {
        let mut rows = Vec::new();

        if !id_strs.is_empty() {
          let placeholders = vec!["?"; id_strs.len()].join(", ");
          let sql = format!(
            "SELECT {STUDENT_COLS} FROM students WHERE student_id IN ({placeholders})"
          );
          let mut stmt = conn.prepare(&sql)?;
          let found = stmt
            .query_map(rusqlite::params_from_iter(id_strs.iter()), read_student)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows.extend(found);
        }

        if !rolls.is_empty() {
          let placeholders = vec!["?"; rolls.len()].join(", ");
          let sql = format!(
            "SELECT {STUDENT_COLS} FROM students WHERE roll_number IN ({placeholders})"
          );
          let mut stmt = conn.prepare(&sql)?;
          let found = stmt
            .query_map(rusqlite::params_from_iter(rolls.iter()), read_student)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows.extend(found);
        }

        Ok(rows)
      })
      .await?;

    // Union of both partitions, deduplicated by identity.
    let mut seen = HashSet::new();
    let mut students = Vec::new();
    for raw in raws {
      let student = raw.into_student()?;
      if seen.insert(student.student_id) {
        students.push(student);
      }
    }
    Ok(students)
  }

  async fn search_students(
    &self,
    class_name: Option<String>,
    name: Option<String>,
  ) -> Result<Vec<Student>> {
    // SQLite LIKE is case-insensitive for ASCII, matching the original's
    // `$options: 'i'` regex.
    let name_pattern = name.map(|n| format!("%{n}%"));

    let raws: Vec<RawStudent> = self
      .conn
      .call(move |conn| {
        let rows = match (class_name, name_pattern) {
          (Some(class), Some(pattern)) => {
            let mut stmt = conn.prepare(&format!(
              "SELECT {STUDENT_COLS} FROM students
               WHERE class_name = ?1 AND name LIKE ?2"
            ))?;
            stmt
              .query_map(rusqlite::params![class, pattern], read_student)?
              .collect::<rusqlite::Result<Vec<_>>>()?
          }
          (Some(class), None) => {
            let mut stmt = conn.prepare(&format!(
              "SELECT {STUDENT_COLS} FROM students WHERE class_name = ?1"
            ))?;
            stmt
              .query_map(rusqlite::params![class], read_student)?
              .collect::<rusqlite::Result<Vec<_>>>()?
          }
          (None, Some(pattern)) => {
            let mut stmt = conn.prepare(&format!(
              "SELECT {STUDENT_COLS} FROM students WHERE name LIKE ?1"
            ))?;
            stmt
              .query_map(rusqlite::params![pattern], read_student)?
              .collect::<rusqlite::Result<Vec<_>>>()?
          }
          (None, None) => {
            let mut stmt = conn
              .prepare(&format!("SELECT {STUDENT_COLS} FROM students"))?;
            stmt
              .query_map([], read_student)?
              .collect::<rusqlite::Result<Vec<_>>>()?
          }
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStudent::into_student).collect()
  }

  // ── Attendance ────────────────────────────────────────────────────────────

  async fn upsert_attendance(
    &self,
    student_ids: Vec<Uuid>,
    day: DateTime<Utc>,
    facts: AttendanceFacts,
  ) -> Result<UpsertOutcome> {
    // Pre-generate surrogate ids so the closure stays deterministic.
    let keys: Vec<(String, String)> = student_ids
      .into_iter()
      .map(|sid| (encode_uuid(Uuid::new_v4()), encode_uuid(sid)))
      .collect();
    let day_str  = encode_dt(day);
    let now_str  = encode_dt(Utc::now());
    let class    = facts.class_name;
    let teacher  = facts.teacher;
    let username = facts.username;
    let status   = encode_status(facts.status).to_owned();

    let (created, updated, first_err): (u64, u64, Option<rusqlite::Error>) =
      self
        .conn
        .call(move |conn| {
          let mut created = 0u64;
          let mut updated = 0u64;
          let mut first_err = None;

          // Unordered batch: a failing key is skipped, the rest proceed.
          for (record_id, student_id) in &keys {
            let exists = match conn
              .query_row(
                "SELECT 1 FROM attendance WHERE student_id = ?1 AND day = ?2",
                rusqlite::params![student_id, day_str],
                |_| Ok(true),
              )
              .optional()
            {
              Ok(found) => found.unwrap_or(false),
              Err(e) => {
                if first_err.is_none() {
                  first_err = Some(e);
                }
                continue;
              }
            };

            let res = conn.execute(
              "INSERT INTO attendance
                 (record_id, student_id, class_name, teacher, username,
                  day, status, correction_history, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '[]', ?8, ?8)
               ON CONFLICT(student_id, day) DO UPDATE SET
                 class_name = excluded.class_name,
                 teacher    = excluded.teacher,
                 username   = excluded.username,
                 status     = excluded.status,
                 updated_at = excluded.updated_at",
              rusqlite::params![
                record_id, student_id, class, teacher, username, day_str,
                status, now_str
              ],
            );

            match res {
              Ok(_) => {
                if exists {
                  updated += 1;
                } else {
                  created += 1;
                }
              }
              Err(e) => {
                if first_err.is_none() {
                  first_err = Some(e);
                }
              }
            }
          }

          Ok((created, updated, first_err))
        })
        .await?;

    // Partial success is the contract; only a batch with zero effect
    // propagates the failure.
    if created == 0
      && updated == 0
      && let Some(e) = first_err
    {
      return Err(tokio_rusqlite::Error::Rusqlite(e).into());
    }

    Ok(UpsertOutcome { created, updated })
  }

  async fn attendance_by_id(
    &self,
    record_id: Uuid,
  ) -> Result<Option<AttendanceRecord>> {
    let id_str = encode_uuid(record_id);

    let raw: Option<RawAttendance> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ATTENDANCE_COLS} FROM attendance WHERE record_id = ?1"
              ),
              rusqlite::params![id_str],
              read_attendance,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAttendance::into_record).transpose()
  }

  async fn attendance_by_key(
    &self,
    student_id: Uuid,
    day: DateTime<Utc>,
  ) -> Result<Option<AttendanceRecord>> {
    let id_str  = encode_uuid(student_id);
    let day_str = encode_dt(day);

    let raw: Option<RawAttendance> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ATTENDANCE_COLS} FROM attendance
                 WHERE student_id = ?1 AND day = ?2"
              ),
              rusqlite::params![id_str, day_str],
              read_attendance,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAttendance::into_record).transpose()
  }

  async fn attendance_for_student_between(
    &self,
    student_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<AttendanceRecord>> {
    let id_str   = encode_uuid(student_id);
    let from_str = encode_dt(from);
    let to_str   = encode_dt(to);

    let raws: Vec<RawAttendance> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ATTENDANCE_COLS} FROM attendance
           WHERE student_id = ?1 AND day >= ?2 AND day < ?3
           ORDER BY day ASC"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![id_str, from_str, to_str],
            read_attendance,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAttendance::into_record).collect()
  }

  async fn list_attendance(
    &self,
    query: AttendanceQuery,
  ) -> Result<Page<AttendanceRow>> {
    let page  = query.page_number();
    let limit = query.page_size();
    let skip  = query.skip();

    // Build WHERE clause dynamically; every parameter is a string.
    let mut conds: Vec<String> = Vec::new();
    let mut params: Vec<String> = Vec::new();

    if let Some(username) = &query.username {
      conds.push(format!("a.username LIKE ?{}", params.len() + 1));
      params.push(format!("%{username}%"));
    }
    if let Some(username) = &query.username_exact {
      conds.push(format!("LOWER(a.username) = LOWER(?{})", params.len() + 1));
      params.push(username.clone());
    }
    if let Some(status) = query.status {
      conds.push(format!("a.status = ?{}", params.len() + 1));
      params.push(encode_status(status).to_owned());
    }
    if let Some(from) = query.day_from {
      conds.push(format!("a.day >= ?{}", params.len() + 1));
      params.push(encode_dt(from));
    }
    if let Some(to) = query.day_to {
      conds.push(format!("a.day < ?{}", params.len() + 1));
      params.push(encode_dt(to));
    }
    if let Some(ids) = &query.student_ids {
      if ids.is_empty() {
        // An empty identity set matches nothing. Callers normally
        // short-circuit before reaching the store.
        conds.push("1 = 0".to_owned());
      } else {
        let mut placeholders = Vec::with_capacity(ids.len());
        for id in ids {
          placeholders.push(format!("?{}", params.len() + 1));
          params.push(encode_uuid(*id));
        }
        conds.push(format!("a.student_id IN ({})", placeholders.join(", ")));
      }
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };

    let (total, raws): (u64, Vec<RawAttendance>) = self
      .conn
      .call(move |conn| {
        let count_sql =
          format!("SELECT COUNT(*) FROM attendance a {where_clause}");
        let total: i64 = conn.query_row(
          &count_sql,
          rusqlite::params_from_iter(params.iter()),
          |row| row.get(0),
        )?;

        let sql = format!(
          "SELECT a.record_id, a.student_id, a.class_name, a.teacher,
                  a.username, a.day, a.status, a.correction_history,
                  a.created_at, a.updated_at,
                  s.name, s.class_name, s.roll_number
           FROM attendance a
           LEFT JOIN students s ON s.student_id = a.student_id
           {where_clause}
           ORDER BY a.day DESC, a.record_id DESC
           LIMIT {limit} OFFSET {skip}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(RawAttendance {
              record_id:          row.get(0)?,
              student_id:         row.get(1)?,
              class_name:         row.get(2)?,
              teacher:            row.get(3)?,
              username:           row.get(4)?,
              day:                row.get(5)?,
              status:             row.get(6)?,
              correction_history: row.get(7)?,
              created_at:         row.get(8)?,
              updated_at:         row.get(9)?,
              student_name:       row.get(10)?,
              student_class:      row.get(11)?,
              student_roll:       row.get(12)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((total as u64, rows))
      })
      .await?;

    let data = raws
      .into_iter()
      .map(|raw| {
        let student = raw.student_summary();
        Ok(AttendanceRow { record: raw.into_record()?, student })
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(Page { total, page, limit, data })
  }

  async fn correct_attendance(
    &self,
    student_id: Uuid,
    day: DateTime<Utc>,
    new_status: AttendanceStatus,
    changed_by: String,
    reason: String,
  ) -> Result<(AttendanceRecord, bool)> {
    let mut record =
      self.attendance_by_key(student_id, day).await?.ok_or_else(|| {
        Error::RecordNotFound(format!(
          "student {student_id} on {}",
          day.date_naive()
        ))
      })?;

    let appended = record
      .apply_correction(new_status, &changed_by, &reason, Utc::now())
      .is_some();
    if !appended {
      return Ok((record, false));
    }

    self.persist_record(&record).await?;
    Ok((record, true))
  }

  async fn update_attendance(
    &self,
    record_id: Uuid,
    patch: AttendancePatch,
  ) -> Result<AttendanceRecord> {
    let mut record = self
      .attendance_by_id(record_id)
      .await?
      .ok_or_else(|| Error::RecordNotFound(record_id.to_string()))?;

    // An all-None patch (audit hints alone don't count) writes nothing.
    if patch.is_empty() {
      return Ok(record);
    }

    let now = Utc::now();
    let mut touched = false;

    // A status change appends the audit entry; a same-status patch is a
    // silent no-op on that field.
    if let Some(status) = patch.status
      && record
        .apply_correction(
          status,
          patch.audit_actor(),
          patch.audit_reason(),
          now,
        )
        .is_some()
    {
      touched = true;
    }
    if let Some(day) = patch.day
      && record.day != day
    {
      record.day = day;
      touched = true;
    }
    if let Some(teacher) = patch.teacher {
      record.teacher = teacher;
      touched = true;
    }
    if let Some(username) = patch.username {
      record.username = username;
      touched = true;
    }
    if let Some(class_name) = patch.class_name {
      record.class_name = class_name;
      touched = true;
    }

    if touched {
      record.updated_at = now;
      self.persist_record(&record).await?;
    }
    Ok(record)
  }

  async fn delete_attendance(&self, record_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(record_id);

    let affected: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM attendance WHERE record_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(affected > 0)
  }
}
