use crate::audit::Revision;
use rusqlite::{params, Connection};

/// Writes a revision and its versions in one transaction.
pub fn insert(conn: &mut Connection, revision: &Revision) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO revisions (id, user_id, comment, created) VALUES (?1, ?2, ?3, ?4)",
        params![
            revision.id.to_string(),
            revision.user_id,
            revision.comment,
            revision.created.to_rfc3339()
        ],
    )?;
    for version in &revision.versions {
        tx.execute(
            "INSERT INTO versions (revision_id, table_name, object_id, action, snapshot)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                revision.id.to_string(),
                version.table,
                version.object_id,
                version.action.as_str(),
                version.snapshot.to_string()
            ],
        )?;
    }
    tx.commit()
}

/// Actions recorded for one object, oldest first.
pub fn actions_for(conn: &Connection, table: &str, object_id: i64) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT action FROM versions WHERE table_name = ?1 AND object_id = ?2 ORDER BY id",
    )?;
    let actions = stmt
        .query_map(params![table, object_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(actions)
}
