use serde::{Deserialize, Serialize};
use serde_json::Value;

/// SRID applied when a project does not declare a datum (WGS84).
pub const DEFAULT_DATUM: i32 = 4326;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
    /// Spatial reference id used for site coordinates when a row does not
    /// specify its own datum.
    pub datum: i32,
    /// IANA time zone name used to localise observation dates.
    pub timezone: Option<String>,
    pub description: String,
    pub attributes: Option<Value>,
    pub site_data_package: Option<Value>,
    /// Ids of the users allowed to modify this project's data.
    pub custodians: Vec<i64>,
}
