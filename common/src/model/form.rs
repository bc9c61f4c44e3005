use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A data-entry layout bound to a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub id: i64,
    pub dataset: i64,
    pub name: String,
    pub layout: Value,
}
