use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file attached to a record. `file` is relative to the media root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub id: i64,
    pub record: i64,
    pub file: String,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}
