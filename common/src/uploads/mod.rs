//! Per-row reports returned by the upload endpoints. A failing row never
//! aborts an upload; it is reported here instead.

use crate::model::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteUploadRow {
    /// Spreadsheet row number, the header being row 1.
    pub row: usize,
    pub site: Option<i64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteUploadReport {
    pub file_name: String,
    pub created: usize,
    pub errors: usize,
    pub rows: Vec<SiteUploadRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordUploadRow {
    pub row: usize,
    pub record: Option<Record>,
    pub errors: BTreeMap<String, String>,
    pub warnings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordUploadReport {
    pub file_name: String,
    /// md5 of the uploaded bytes.
    pub checksum: String,
    pub dry_run: bool,
    pub total: usize,
    pub created: usize,
    pub errors: usize,
    pub rows: Vec<RecordUploadRow>,
}
