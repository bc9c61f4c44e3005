use super::{json_text, object_column, point_column};
use biosys_common::model::geometry::Point;
use biosys_common::model::site::Site;
use biosys_common::requests::SiteRequest;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};

const COLUMNS: &str = "id, project_id, parent_site_id, code, name, comments, geometry, attributes";

fn from_row(row: &Row) -> rusqlite::Result<Site> {
    Ok(Site {
        id: row.get(0)?,
        project: row.get(1)?,
        parent_site: row.get(2)?,
        code: row.get(3)?,
        name: row.get(4)?,
        comments: row.get(5)?,
        geometry: point_column(row, 6)?,
        attributes: object_column(row, 7)?,
    })
}

fn attributes_text(attributes: &Map<String, Value>) -> String {
    json_text(&Value::Object(attributes.clone()))
}

pub fn list(conn: &Connection, project: Option<i64>) -> rusqlite::Result<Vec<Site>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM sites WHERE (?1 IS NULL OR project_id = ?1) ORDER BY id"
    ))?;
    let sites = stmt
        .query_map(params![project], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(sites)
}

pub fn get(conn: &Connection, id: i64) -> rusqlite::Result<Option<Site>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM sites WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()
}

/// Site looked up by one of its natural keys inside a project. Used to
/// resolve dataset schema foreign keys, which reference `code`, `name` or
/// `id`.
pub fn find_by_field(
    conn: &Connection,
    project_id: i64,
    field: &str,
    value: &str,
) -> rusqlite::Result<Option<Site>> {
    let column = match field {
        "code" => "code",
        "name" => "name",
        "id" => "CAST(id AS TEXT)",
        _ => return Ok(None),
    };
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM sites WHERE project_id = ?1 AND {column} = ?2 ORDER BY id LIMIT 1"),
        params![project_id, value],
        from_row,
    )
    .optional()
}

/// First site with this code in any project.
pub fn find_by_code_any_project(conn: &Connection, code: &str) -> rusqlite::Result<Option<Site>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM sites WHERE code = ?1 ORDER BY id LIMIT 1"),
        params![code],
        from_row,
    )
    .optional()
}

pub fn insert(conn: &Connection, req: &SiteRequest) -> rusqlite::Result<Site> {
    conn.execute(
        "INSERT INTO sites (project_id, parent_site_id, code, name, comments, geometry, attributes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            req.project,
            req.parent_site,
            req.code,
            req.name,
            req.comments,
            req.geometry.map(|g| g.to_ewkt()),
            attributes_text(&req.attributes),
        ],
    )?;
    get(conn, conn.last_insert_rowid())?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn update(conn: &Connection, id: i64, req: &SiteRequest) -> rusqlite::Result<Option<Site>> {
    let changed = conn.execute(
        "UPDATE sites SET project_id = ?1, parent_site_id = ?2, code = ?3, name = ?4, comments = ?5,
         geometry = ?6, attributes = ?7 WHERE id = ?8",
        params![
            req.project,
            req.parent_site,
            req.code,
            req.name,
            req.comments,
            req.geometry.map(|g| g.to_ewkt()),
            attributes_text(&req.attributes),
            id
        ],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    get(conn, id)
}

/// Values written by the site upload. `None` geometry or parent keep what
/// an existing site already has.
pub struct SiteValues<'a> {
    pub name: &'a str,
    pub comments: &'a str,
    pub attributes: &'a Map<String, Value>,
    pub geometry: Option<Point>,
    pub parent_site: Option<i64>,
}

/// Creates the site `(project, code)` or updates it in place.
pub fn upsert_by_code(
    conn: &Connection,
    project_id: i64,
    code: &str,
    values: &SiteValues<'_>,
) -> rusqlite::Result<Site> {
    let id: i64 = conn.query_row(
        "INSERT INTO sites (project_id, code, name, comments, attributes, geometry, parent_site_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (project_id, code) DO UPDATE SET
             name = excluded.name,
             comments = excluded.comments,
             attributes = excluded.attributes,
             geometry = COALESCE(excluded.geometry, sites.geometry),
             parent_site_id = COALESCE(excluded.parent_site_id, sites.parent_site_id)
         RETURNING id",
        params![
            project_id,
            code,
            values.name,
            values.comments,
            attributes_text(values.attributes),
            values.geometry.map(|g| g.to_ewkt()),
            values.parent_site,
        ],
        |row| row.get(0),
    )?;
    get(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    Ok(conn.execute("DELETE FROM sites WHERE id = ?1", params![id])? > 0)
}

pub fn count(conn: &Connection) -> rusqlite::Result<u64> {
    conn.query_row("SELECT COUNT(*) FROM sites", [], |row| row.get(0))
}
