use super::{datetime_column, json_column, json_text, now, object_column, point_column};
use biosys_common::model::dataset::DatasetType;
use biosys_common::model::record::Record;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use std::collections::HashMap;

const COLUMNS: &str =
    "id, dataset_id, site_id, data, datetime, geometry, species_name, name_id, client_id, source_info";

fn from_row(row: &Row) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        dataset: row.get(1)?,
        site: row.get(2)?,
        data: object_column(row, 3)?,
        datetime: datetime_column(row, 4)?,
        geometry: point_column(row, 5)?,
        species_name: row.get(6)?,
        name_id: row.get(7)?,
        client_id: row.get(8)?,
        source_info: json_column(row, 9)?,
    })
}

pub fn list(conn: &Connection, dataset: Option<i64>) -> rusqlite::Result<Vec<Record>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM records WHERE (?1 IS NULL OR dataset_id = ?1) ORDER BY id"
    ))?;
    let records = stmt
        .query_map(params![dataset], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

pub fn get(conn: &Connection, id: i64) -> rusqlite::Result<Option<Record>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM records WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()
}

/// Persists a record built by the record creator and returns it with its id.
pub fn insert(conn: &Connection, record: &Record) -> rusqlite::Result<Record> {
    let stamp = now().to_rfc3339();
    conn.execute(
        "INSERT INTO records (dataset_id, site_id, data, datetime, geometry, species_name, name_id,
         client_id, source_info, created, last_modified)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            record.dataset,
            record.site,
            json_text(&Value::Object(record.data.clone())),
            record.datetime.map(|dt| dt.to_rfc3339()),
            record.geometry.map(|g| g.to_ewkt()),
            record.species_name,
            record.name_id,
            record.client_id,
            record.source_info.as_ref().map(json_text),
            stamp,
        ],
    )?;
    let mut saved = record.clone();
    saved.id = Some(conn.last_insert_rowid());
    Ok(saved)
}

pub fn update(conn: &Connection, id: i64, record: &Record) -> rusqlite::Result<Option<Record>> {
    let changed = conn.execute(
        "UPDATE records SET site_id = ?1, data = ?2, datetime = ?3, geometry = ?4, species_name = ?5,
         name_id = ?6, client_id = ?7, last_modified = ?8 WHERE id = ?9",
        params![
            record.site,
            json_text(&Value::Object(record.data.clone())),
            record.datetime.map(|dt| dt.to_rfc3339()),
            record.geometry.map(|g| g.to_ewkt()),
            record.species_name,
            record.name_id,
            record.client_id,
            now().to_rfc3339(),
            id
        ],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    get(conn, id)
}

pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    Ok(conn.execute("DELETE FROM records WHERE id = ?1", params![id])? > 0)
}

/// Project owning the record, through its dataset.
pub fn project_id(conn: &Connection, record_id: i64) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT d.project_id FROM records r JOIN datasets d ON d.id = r.dataset_id WHERE r.id = ?1",
        params![record_id],
        |row| row.get(0),
    )
    .optional()
}

pub fn count_by_type(conn: &Connection) -> rusqlite::Result<HashMap<DatasetType, u64>> {
    let mut stmt = conn.prepare(
        "SELECT d.type, COUNT(*) FROM records r JOIN datasets d ON d.id = r.dataset_id GROUP BY d.type",
    )?;
    let counts = stmt
        .query_map([], |row| {
            let text: String = row.get(0)?;
            let dataset_type = text.parse::<DatasetType>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, Type::Text, e.into())
            })?;
            Ok((dataset_type, row.get(1)?))
        })?
        .collect::<rusqlite::Result<HashMap<_, _>>>()?;
    Ok(counts)
}
