//! Request payloads accepted by the API.

use crate::model::dataset::DatasetType;
use crate::model::geometry::Point;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /api/projects` and `PUT /api/projects/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectRequest {
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub datum: Option<i32>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attributes: Option<Value>,
    #[serde(default)]
    pub site_data_package: Option<Value>,
    /// Custodian user ids; the requesting user is always added on creation.
    #[serde(default)]
    pub custodians: Vec<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteRequest {
    pub project: i64,
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub parent_site: Option<i64>,
    #[serde(default)]
    pub geometry: Option<Point>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRequest {
    pub project: i64,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub dataset_type: DatasetType,
    #[serde(default)]
    pub description: String,
    pub data_package: Value,
}

/// Body of `POST /api/records` and `PUT /api/records/{id}`. `data` goes
/// through the same validation as an uploaded row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordRequest {
    pub dataset: i64,
    pub data: Map<String, Value>,
    #[serde(default)]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormRequest {
    pub dataset: i64,
    pub name: String,
    #[serde(default)]
    pub layout: Value,
}

/// Body of `POST /api/media`; the file travels base64 encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRequest {
    pub record: i64,
    pub file_name: String,
    pub base64: String,
}
