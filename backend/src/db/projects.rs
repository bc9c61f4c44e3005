use super::{json_column, json_text};
use biosys_common::model::project::{Project, DEFAULT_DATUM};
use biosys_common::requests::ProjectRequest;
use rusqlite::{params, Connection, OptionalExtension, Row};

const COLUMNS: &str =
    "id, name, code, datum, timezone, description, attributes, site_data_package";

fn from_row(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        datum: row.get(3)?,
        timezone: row.get(4)?,
        description: row.get(5)?,
        attributes: json_column(row, 6)?,
        site_data_package: json_column(row, 7)?,
        custodians: Vec::new(),
    })
}

fn with_custodians(conn: &Connection, mut project: Project) -> rusqlite::Result<Project> {
    project.custodians = custodians(conn, project.id)?;
    Ok(project)
}

pub fn custodians(conn: &Connection, project_id: i64) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM project_custodians WHERE project_id = ?1 ORDER BY user_id",
    )?;
    let ids = stmt
        .query_map(params![project_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

fn set_custodians(conn: &Connection, project_id: i64, users: &[i64]) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM project_custodians WHERE project_id = ?1",
        params![project_id],
    )?;
    for user_id in users {
        conn.execute(
            "INSERT OR IGNORE INTO project_custodians (project_id, user_id) VALUES (?1, ?2)",
            params![project_id, user_id],
        )?;
    }
    Ok(())
}

pub fn is_custodian(conn: &Connection, project_id: i64, user_id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM project_custodians WHERE project_id = ?1 AND user_id = ?2)",
        params![project_id, user_id],
        |row| row.get(0),
    )
}

pub fn list(conn: &Connection) -> rusqlite::Result<Vec<Project>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM projects ORDER BY id"))?;
    let projects = stmt
        .query_map([], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    projects
        .into_iter()
        .map(|p| with_custodians(conn, p))
        .collect()
}

pub fn get(conn: &Connection, id: i64) -> rusqlite::Result<Option<Project>> {
    let project = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM projects WHERE id = ?1"),
            params![id],
            from_row,
        )
        .optional()?;
    project.map(|p| with_custodians(conn, p)).transpose()
}

/// Creates a project. `creator` always ends up among the custodians.
pub fn insert(conn: &Connection, req: &ProjectRequest, creator: i64) -> rusqlite::Result<Project> {
    conn.execute(
        "INSERT INTO projects (name, code, datum, timezone, description, attributes, site_data_package)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            req.name,
            req.code,
            req.datum.unwrap_or(DEFAULT_DATUM),
            req.timezone,
            req.description,
            req.attributes.as_ref().map(json_text),
            req.site_data_package.as_ref().map(json_text),
        ],
    )?;
    let id = conn.last_insert_rowid();
    let mut custodians = req.custodians.clone();
    if !custodians.contains(&creator) {
        custodians.push(creator);
    }
    set_custodians(conn, id, &custodians)?;
    get(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

/// Replaces the project fields. An empty custodian list leaves custodians
/// untouched.
pub fn update(conn: &Connection, id: i64, req: &ProjectRequest) -> rusqlite::Result<Option<Project>> {
    let changed = conn.execute(
        "UPDATE projects SET name = ?1, code = ?2, datum = ?3, timezone = ?4, description = ?5,
         attributes = ?6, site_data_package = ?7 WHERE id = ?8",
        params![
            req.name,
            req.code,
            req.datum.unwrap_or(DEFAULT_DATUM),
            req.timezone,
            req.description,
            req.attributes.as_ref().map(json_text),
            req.site_data_package.as_ref().map(json_text),
            id
        ],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    if !req.custodians.is_empty() {
        set_custodians(conn, id, &req.custodians)?;
    }
    get(conn, id)
}

pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    Ok(conn.execute("DELETE FROM projects WHERE id = ?1", params![id])? > 0)
}

pub fn count(conn: &Connection) -> rusqlite::Result<u64> {
    conn.query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))
}
