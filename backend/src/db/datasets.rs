use super::{json_column, json_text};
use biosys_common::model::dataset::{Dataset, DatasetType};
use biosys_common::requests::DatasetRequest;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use std::collections::HashMap;

const COLUMNS: &str = "id, project_id, name, code, type, description, data_package";

fn dataset_type(row: &Row, idx: usize) -> rusqlite::Result<DatasetType> {
    let text: String = row.get(idx)?;
    text.parse::<DatasetType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn from_row(row: &Row) -> rusqlite::Result<Dataset> {
    Ok(Dataset {
        id: row.get(0)?,
        project: row.get(1)?,
        name: row.get(2)?,
        code: row.get(3)?,
        dataset_type: dataset_type(row, 4)?,
        description: row.get(5)?,
        data_package: json_column(row, 6)?.unwrap_or(Value::Null),
    })
}

pub fn list(conn: &Connection, project: Option<i64>) -> rusqlite::Result<Vec<Dataset>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM datasets WHERE (?1 IS NULL OR project_id = ?1) ORDER BY id"
    ))?;
    let datasets = stmt
        .query_map(params![project], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(datasets)
}

pub fn get(conn: &Connection, id: i64) -> rusqlite::Result<Option<Dataset>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM datasets WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()
}

pub fn insert(conn: &Connection, req: &DatasetRequest) -> rusqlite::Result<Dataset> {
    conn.execute(
        "INSERT INTO datasets (project_id, name, code, type, description, data_package)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            req.project,
            req.name,
            req.code,
            req.dataset_type.as_str(),
            req.description,
            json_text(&req.data_package),
        ],
    )?;
    get(conn, conn.last_insert_rowid())?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn update(conn: &Connection, id: i64, req: &DatasetRequest) -> rusqlite::Result<Option<Dataset>> {
    let changed = conn.execute(
        "UPDATE datasets SET project_id = ?1, name = ?2, code = ?3, type = ?4, description = ?5,
         data_package = ?6 WHERE id = ?7",
        params![
            req.project,
            req.name,
            req.code,
            req.dataset_type.as_str(),
            req.description,
            json_text(&req.data_package),
            id
        ],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    get(conn, id)
}

pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    Ok(conn.execute("DELETE FROM datasets WHERE id = ?1", params![id])? > 0)
}

pub fn count_by_type(conn: &Connection) -> rusqlite::Result<HashMap<DatasetType, u64>> {
    let mut stmt = conn.prepare("SELECT type, COUNT(*) FROM datasets GROUP BY type")?;
    let counts = stmt
        .query_map([], |row| Ok((dataset_type(row, 0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<HashMap<_, _>>>()?;
    Ok(counts)
}
