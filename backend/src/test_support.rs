//! Fixtures shared by the unit and HTTP tests.

use crate::db::{datasets, projects, users, Database};
use crate::import::file_reader::UploadedFile;
use crate::import::Row;
use crate::species::StaticSpeciesFacade;
use crate::state::AppState;
use biosys_common::model::dataset::{Dataset, DatasetType};
use biosys_common::model::project::Project;
use biosys_common::model::user::User;
use biosys_common::requests::{DatasetRequest, ProjectRequest};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

/// A migrated database in a fresh temporary directory. Keep the directory
/// alive for as long as the database is used.
pub fn test_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("biosys.sqlite"));
    db.migrate().unwrap();
    (dir, db)
}

fn new_user(conn: &Connection, username: &str, is_superuser: bool) -> (User, String) {
    users::insert(
        conn,
        &users::NewUser {
            username,
            first_name: "",
            last_name: "",
            email: "",
            is_superuser,
        },
    )
    .unwrap()
}

/// A regular user and its token.
pub fn user(conn: &Connection, username: &str) -> (User, String) {
    new_user(conn, username, false)
}

pub fn superuser(conn: &Connection, username: &str) -> (User, String) {
    new_user(conn, username, true)
}

pub fn project_request(name: &str) -> ProjectRequest {
    ProjectRequest {
        name: name.to_string(),
        ..Default::default()
    }
}

/// A project whose only custodian is a new user named `owner-<name>`,
/// returned with that user's token.
pub fn owned_project(conn: &Connection, name: &str) -> (Project, String) {
    let (owner, token) = user(conn, &format!("owner-{name}"));
    let project = projects::insert(conn, &project_request(name), owner.id).unwrap();
    (project, token)
}

pub fn project(conn: &Connection, name: &str) -> Project {
    owned_project(conn, name).0
}

/// A data package with a single resource described by `fields`.
pub fn data_package(fields: Value) -> Value {
    json!({"name": "test", "resources": [{"name": "test", "schema": {"fields": fields}}]})
}

/// An unsaved dataset, enough for schema and validator tests.
pub fn dataset(dataset_type: DatasetType, fields: Value) -> Dataset {
    Dataset {
        id: 1,
        project: 1,
        name: "Test".to_string(),
        code: None,
        dataset_type,
        description: String::new(),
        data_package: data_package(fields),
    }
}

pub fn dataset_request(project: i64, dataset_type: DatasetType, data_package: Value) -> DatasetRequest {
    DatasetRequest {
        project,
        name: format!("{dataset_type} data"),
        code: None,
        dataset_type,
        description: String::new(),
        data_package,
    }
}

pub fn create_dataset_with_package(
    conn: &Connection,
    project: i64,
    dataset_type: DatasetType,
    data_package: Value,
) -> Dataset {
    datasets::insert(conn, &dataset_request(project, dataset_type, data_package)).unwrap()
}

pub fn create_dataset(conn: &Connection, project: i64, dataset_type: DatasetType, fields: Value) -> Dataset {
    create_dataset_with_package(conn, project, dataset_type, data_package(fields))
}

/// The first data row of a file with these headers.
pub fn row(headers: &[&str], values: &[&str]) -> Row {
    Row::new(
        headers.iter().map(|h| h.to_string()).collect(),
        values.iter().map(|v| v.to_string()).collect(),
        2,
    )
}

pub fn csv_file(content: &str) -> UploadedFile {
    UploadedFile {
        file_name: "test.csv".to_string(),
        content_type: "text/csv".to_string(),
        bytes: content.as_bytes().to_vec(),
    }
}

pub fn species_facade() -> StaticSpeciesFacade {
    StaticSpeciesFacade::new([("Canis lupus", 25_000), ("Vulpes vulpes", 25_001)])
}

/// Application state over `db`, storing media next to the database file.
pub fn app_state(db: Database) -> AppState {
    let media_root = db
        .path()
        .parent()
        .map(|p| p.join("media"))
        .unwrap_or_else(|| "media".into());
    AppState {
        db,
        species: Arc::new(species_facade()),
        media_root,
        time_zone: chrono_tz::Australia::Perth,
        max_upload_bytes: 1024 * 1024,
    }
}
