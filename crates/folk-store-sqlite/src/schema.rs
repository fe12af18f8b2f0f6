//! SQL schema for the Folk identity store.
//!
//! Executed once at connection startup; idempotent thanks to
//! `CREATE ... IF NOT EXISTS`. The mapping is deliberately minimal — one
//! row per merged contact, nothing else is ever persisted.

/// Full schema DDL.
///
/// `person_id` is the bare integer; the `folk://` scheme is applied at the
/// API boundary only.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS persons (
    contact_id TEXT    UNIQUE NOT NULL,
    person_id  INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS contact_id_index ON persons (contact_id);
CREATE INDEX IF NOT EXISTS person_id_index  ON persons (person_id);
";
