//! SQL schema for the rollbook SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS students (
    student_id  TEXT PRIMARY KEY,
    roll_number INTEGER NOT NULL UNIQUE,  -- school-administration id
    name        TEXT NOT NULL,
    class_name  TEXT NOT NULL,
    mobile      TEXT,
    email       TEXT,
    created_at  TEXT NOT NULL             -- ISO 8601 UTC
);

-- One row per (student, calendar day). `student_id` is a copied key, not a
-- live join: nothing cascades on student updates.
CREATE TABLE IF NOT EXISTS attendance (
    record_id          TEXT PRIMARY KEY,
    student_id         TEXT NOT NULL,
    class_name         TEXT NOT NULL,
    teacher            TEXT NOT NULL,
    username           TEXT NOT NULL,
    day                TEXT NOT NULL,     -- ISO 8601 UTC midnight
    status             TEXT NOT NULL,     -- 'Present' | 'Absent' | 'Leave'
    correction_history TEXT NOT NULL DEFAULT '[]',
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL
);

-- The natural-key invariant: exactly one record per (student, day).
CREATE UNIQUE INDEX IF NOT EXISTS attendance_student_day_key
    ON attendance(student_id, day);

CREATE INDEX IF NOT EXISTS attendance_day_idx      ON attendance(day);
CREATE INDEX IF NOT EXISTS attendance_username_idx ON attendance(username);
CREATE INDEX IF NOT EXISTS students_class_idx      ON students(class_name);

PRAGMA user_version = 1;
";
