use super::{now, utc_column};
use biosys_common::model::media::Media;
use rusqlite::{params, Connection, OptionalExtension, Row};

const COLUMNS: &str = "id, record_id, file, created, last_modified";

fn from_row(row: &Row) -> rusqlite::Result<Media> {
    Ok(Media {
        id: row.get(0)?,
        record: row.get(1)?,
        file: row.get(2)?,
        created: utc_column(row, 3)?,
        last_modified: utc_column(row, 4)?,
    })
}

pub fn list(conn: &Connection, record: Option<i64>) -> rusqlite::Result<Vec<Media>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM media WHERE (?1 IS NULL OR record_id = ?1) ORDER BY id"
    ))?;
    let media = stmt
        .query_map(params![record], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(media)
}

pub fn get(conn: &Connection, id: i64) -> rusqlite::Result<Option<Media>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM media WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()
}

pub fn insert(conn: &Connection, record: i64, file: &str) -> rusqlite::Result<Media> {
    let stamp = now().to_rfc3339();
    conn.execute(
        "INSERT INTO media (record_id, file, created, last_modified) VALUES (?1, ?2, ?3, ?3)",
        params![record, file, stamp],
    )?;
    get(conn, conn.last_insert_rowid())?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    Ok(conn.execute("DELETE FROM media WHERE id = ?1", params![id])? > 0)
}
