//! Audit trail of changes.
//!
//! A handler opens a [`Revision`] for the request, records a [`Version`]
//! for every object it creates, updates or deletes, and saves the revision
//! once its own work is done. The revision is written on a separate
//! connection after the data has been committed: a failure to store the
//! audit entry is logged and never undoes the change itself.

use crate::db::{self, Database};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Created,
    Updated,
    Deleted,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Created => "created",
            Action::Updated => "updated",
            Action::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Version {
    pub table: &'static str,
    pub object_id: i64,
    pub action: Action,
    pub snapshot: Value,
}

#[derive(Debug, Clone)]
pub struct Revision {
    pub id: Uuid,
    pub user_id: Option<i64>,
    pub comment: String,
    pub created: DateTime<Utc>,
    pub versions: Vec<Version>,
}

impl Revision {
    pub fn new(user_id: Option<i64>, comment: impl Into<String>) -> Self {
        Revision {
            id: Uuid::new_v4(),
            user_id,
            comment: comment.into(),
            created: db::now(),
            versions: Vec::new(),
        }
    }

    pub fn record<T: Serialize>(
        &mut self,
        table: &'static str,
        object_id: i64,
        action: Action,
        snapshot: &T,
    ) {
        let snapshot = serde_json::to_value(snapshot).unwrap_or(Value::Null);
        self.versions.push(Version {
            table,
            object_id,
            action,
            snapshot,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn save(self, db: &Database) {
        if self.is_empty() {
            return;
        }
        let result = db
            .connect()
            .and_then(|mut conn| db::revisions::insert(&mut conn, &self));
        match result {
            Ok(()) => debug!(
                "revision {} saved with {} version(s)",
                self.id,
                self.versions.len()
            ),
            Err(e) => warn!("could not save revision {}: {}", self.id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn saved_revisions_are_queryable() {
        let (_dir, db) = test_db();
        let mut revision = Revision::new(None, "test");
        revision.record("sites", 7, Action::Created, &json!({"code": "A"}));
        revision.record("sites", 7, Action::Updated, &json!({"code": "B"}));
        revision.save(&db);

        let conn = db.connect().unwrap();
        let actions = db::revisions::actions_for(&conn, "sites", 7).unwrap();
        assert_eq!(actions, vec!["created", "updated"]);
    }

    #[rstest]
    fn empty_revisions_are_not_written() {
        let (_dir, db) = test_db();
        Revision::new(None, "nothing").save(&db);
        let conn = db.connect().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM revisions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
