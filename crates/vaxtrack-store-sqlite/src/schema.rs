//! SQL schema for the vaxtrack SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS students (
    id             TEXT PRIMARY KEY,
    student_id     TEXT NOT NULL UNIQUE,   -- school-issued identifier
    name           TEXT NOT NULL,
    date_of_birth  TEXT,                   -- YYYY-MM-DD
    gender         TEXT,                   -- 'Male' | 'Female' | 'Other'
    grade          TEXT NOT NULL,
    section        TEXT,
    parent_name    TEXT,
    contact_number TEXT,
    address        TEXT,
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS drives (
    id                TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    vaccine_name      TEXT NOT NULL,
    date              TEXT NOT NULL,       -- YYYY-MM-DD
    total_doses       INTEGER NOT NULL CHECK (total_doses >= 1),
    available_doses   INTEGER NOT NULL CHECK (available_doses >= 0),
    applicable_grades TEXT NOT NULL DEFAULT '[]',
    status            TEXT NOT NULL DEFAULT 'scheduled',
    description       TEXT,
    created_at        TEXT NOT NULL
);

-- At most one live drive per calendar day.
CREATE UNIQUE INDEX IF NOT EXISTS drives_live_date_idx
    ON drives(date) WHERE status != 'cancelled';

-- Append-only. No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS vaccinations (
    id              TEXT PRIMARY KEY,
    student         TEXT NOT NULL REFERENCES students(id),
    drive_id        TEXT NOT NULL REFERENCES drives(id),
    date            TEXT NOT NULL,
    administered_by TEXT NOT NULL,
    notes           TEXT,
    grade           TEXT NOT NULL,         -- student's grade when recorded
    UNIQUE (student, drive_id)
);

CREATE INDEX IF NOT EXISTS students_grade_idx       ON students(grade);
CREATE INDEX IF NOT EXISTS drives_date_idx          ON drives(date);
CREATE INDEX IF NOT EXISTS vaccinations_drive_idx   ON vaccinations(drive_id);
CREATE INDEX IF NOT EXISTS vaccinations_student_idx ON vaccinations(student);

PRAGMA user_version = 1;
";
