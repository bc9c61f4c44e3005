use super::{json_column, json_text};
use biosys_common::model::form::Form;
use biosys_common::requests::FormRequest;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;

const COLUMNS: &str = "id, dataset_id, name, layout";

fn from_row(row: &Row) -> rusqlite::Result<Form> {
    Ok(Form {
        id: row.get(0)?,
        dataset: row.get(1)?,
        name: row.get(2)?,
        layout: json_column(row, 3)?.unwrap_or(Value::Null),
    })
}

pub fn list(conn: &Connection, dataset: Option<i64>) -> rusqlite::Result<Vec<Form>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM forms WHERE (?1 IS NULL OR dataset_id = ?1) ORDER BY id"
    ))?;
    let forms = stmt
        .query_map(params![dataset], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(forms)
}

pub fn get(conn: &Connection, id: i64) -> rusqlite::Result<Option<Form>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM forms WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()
}

pub fn insert(conn: &Connection, req: &FormRequest) -> rusqlite::Result<Form> {
    conn.execute(
        "INSERT INTO forms (dataset_id, name, layout) VALUES (?1, ?2, ?3)",
        params![req.dataset, req.name, json_text(&req.layout)],
    )?;
    get(conn, conn.last_insert_rowid())?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    Ok(conn.execute("DELETE FROM forms WHERE id = ?1", params![id])? > 0)
}
