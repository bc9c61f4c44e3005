//! SQLite persistence.
//!
//! Each sub-module is a repository of plain functions over a
//! [`rusqlite::Connection`]; a [`rusqlite::Transaction`] can be passed
//! anywhere a connection is expected, so callers own their transaction
//! boundaries.

pub mod datasets;
pub mod forms;
pub mod media;
pub mod projects;
pub mod records;
pub mod revisions;
pub mod sites;
pub mod users;

use biosys_common::model::geometry::Point;
use chrono::{DateTime, FixedOffset, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL DEFAULT '',
    is_superuser INTEGER NOT NULL DEFAULT 0,
    token TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    code TEXT,
    datum INTEGER NOT NULL DEFAULT 4326,
    timezone TEXT,
    description TEXT NOT NULL DEFAULT '',
    attributes TEXT,
    site_data_package TEXT
);
CREATE TABLE IF NOT EXISTS project_custodians (
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (project_id, user_id)
);
CREATE TABLE IF NOT EXISTS sites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    parent_site_id INTEGER REFERENCES sites(id) ON DELETE SET NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    comments TEXT NOT NULL DEFAULT '',
    geometry TEXT,
    attributes TEXT,
    UNIQUE (project_id, code)
);
CREATE TABLE IF NOT EXISTS datasets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    code TEXT,
    type TEXT NOT NULL CHECK (type IN ('generic', 'observation', 'species_observation')),
    description TEXT NOT NULL DEFAULT '',
    data_package TEXT NOT NULL,
    UNIQUE (project_id, name)
);
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dataset_id INTEGER NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
    site_id INTEGER REFERENCES sites(id) ON DELETE SET NULL,
    data TEXT NOT NULL,
    datetime TEXT,
    geometry TEXT,
    species_name TEXT,
    name_id INTEGER,
    client_id TEXT,
    source_info TEXT,
    created TEXT NOT NULL,
    last_modified TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS records_dataset_idx ON records (dataset_id);
CREATE TABLE IF NOT EXISTS forms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dataset_id INTEGER NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    layout TEXT
);
CREATE TABLE IF NOT EXISTS media (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    record_id INTEGER NOT NULL REFERENCES records(id) ON DELETE CASCADE,
    file TEXT NOT NULL,
    created TEXT NOT NULL,
    last_modified TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS revisions (
    id TEXT PRIMARY KEY,
    user_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
    comment TEXT NOT NULL DEFAULT '',
    created TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS versions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    revision_id TEXT NOT NULL REFERENCES revisions(id) ON DELETE CASCADE,
    table_name TEXT NOT NULL,
    object_id INTEGER NOT NULL,
    action TEXT NOT NULL,
    snapshot TEXT
);
"#;

/// Handle on the database file. Cheap to clone; a connection is opened per
/// unit of work.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Database { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a connection with foreign-key enforcement turned on, which the
    /// cascade and set-null rules depend on.
    pub fn connect(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Creates missing tables. Safe to run on every start.
    pub fn migrate(&self) -> rusqlite::Result<()> {
        self.connect()?.execute_batch(SCHEMA)
    }
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

pub(crate) fn json_text(value: &Value) -> String {
    value.to_string()
}

pub(crate) fn json_column(row: &Row, idx: usize) -> rusqlite::Result<Option<Value>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| serde_json::from_str(&t).map_err(|e| conversion_error(idx, e.to_string())))
        .transpose()
}

/// A JSON column that should hold an object; anything else reads as empty.
pub(crate) fn object_column(row: &Row, idx: usize) -> rusqlite::Result<Map<String, Value>> {
    match json_column(row, idx)? {
        Some(Value::Object(map)) => Ok(map),
        _ => Ok(Map::new()),
    }
}

pub(crate) fn point_column(row: &Row, idx: usize) -> rusqlite::Result<Option<Point>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        Point::parse_ewkt(&t).ok_or_else(|| conversion_error(idx, format!("invalid EWKT '{t}'")))
    })
    .transpose()
}

pub(crate) fn datetime_column(
    row: &Row,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<FixedOffset>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| DateTime::parse_from_rfc3339(&t).map_err(|e| conversion_error(idx, e.to_string())))
        .transpose()
}

pub(crate) fn utc_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e.to_string()))
}
