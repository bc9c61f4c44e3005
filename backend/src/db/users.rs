use biosys_common::model::user::User;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const COLUMNS: &str = "id, username, first_name, last_name, email, is_superuser";

fn from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        is_superuser: row.get(5)?,
    })
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub is_superuser: bool,
}

/// Inserts a user with a freshly generated API token and returns both.
pub fn insert(conn: &Connection, user: &NewUser<'_>) -> rusqlite::Result<(User, String)> {
    let token = Uuid::new_v4().simple().to_string();
    conn.execute(
        "INSERT INTO users (username, first_name, last_name, email, is_superuser, token)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.username,
            user.first_name,
            user.last_name,
            user.email,
            user.is_superuser,
            token
        ],
    )?;
    let created = User {
        id: conn.last_insert_rowid(),
        username: user.username.to_string(),
        first_name: user.first_name.to_string(),
        last_name: user.last_name.to_string(),
        email: user.email.to_string(),
        is_superuser: user.is_superuser,
    };
    Ok((created, token))
}

pub fn find_by_token(conn: &Connection, token: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE token = ?1"),
        params![token],
        from_row,
    )
    .optional()
}

pub fn get(conn: &Connection, id: i64) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()
}
