//! Import of tabular survey data.
//!
//! - `file_reader`: turns an uploaded CSV or XLSX file into a lazy sequence
//!   of header-keyed [`Row`]s.
//! - `site_uploader`: creates or updates the sites of a project from rows.
//! - `record_creator`: validates rows against a dataset schema and builds
//!   the dataset's records.
//!
//! Problems with a single row are reported alongside that row and never stop
//! the batch. Only an unreadable file fails the whole import.

pub mod file_reader;
pub mod record_creator;
pub mod site_uploader;

use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Wrong file type {content_type}. Should be one of: {supported}")]
    UnsupportedType {
        content_type: String,
        supported: String,
    },
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid spreadsheet: {0}")]
    Spreadsheet(String),
    #[error("the workbook has no worksheet")]
    EmptyWorkbook,
}

/// One data row of an uploaded table, keyed by the header row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    headers: Arc<[String]>,
    values: Vec<String>,
    number: usize,
}

impl Row {
    /// `values` is padded or truncated to the header length. `number` is
    /// the spreadsheet row number, the header being row 1.
    pub fn new(headers: Arc<[String]>, mut values: Vec<String>, number: usize) -> Self {
        values.resize(headers.len(), String::new());
        Row {
            headers,
            values,
            number,
        }
    }

    /// Row built from a JSON object, as posted to the records API.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let headers: Arc<[String]> = map.keys().cloned().collect();
        let values = map
            .values()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect();
        Row::new(headers, values, 1)
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Value of the column with exactly this header.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h == column)
            .map(|idx| self.values[idx].as_str())
    }

    /// First non-blank value among the columns whose header matches one of
    /// `aliases`, ignoring case and surrounding whitespace.
    pub fn get_value(&self, aliases: &[&str]) -> Option<&str> {
        aliases.iter().find_map(|alias| {
            self.iter()
                .find(|(h, _)| h.trim().eq_ignore_ascii_case(alias))
                .map(|(_, v)| v.trim())
                .filter(|v| !v.is_empty())
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn is_blank(&self) -> bool {
        self.values.iter().all(|v| v.trim().is_empty())
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.iter()
            .map(|(h, v)| (h.to_string(), Value::String(v.to_string())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::row;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn short_rows_are_padded() {
        let r = row(&["a", "b", "c"], &["1"]);
        assert_eq!(r.get("c"), Some(""));
        assert_eq!(r.get("d"), None);
    }

    #[rstest]
    #[case(&["code", "Site Code"], Some("S1"))]
    #[case(&["site code"], Some("S1"))]
    #[case(&["name"], None)]
    fn alias_lookup_ignores_case(#[case] aliases: &[&str], #[case] expected: Option<&str>) {
        let r = row(&[" Site Code ", "Name"], &[" S1 ", "  "]);
        assert_eq!(r.get_value(aliases), expected);
    }

    #[rstest]
    fn rows_from_json_stringify_values() {
        let map = json!({"What": "Bird", "Count": 3, "Seen": true, "Notes": null});
        let r = Row::from_map(map.as_object().unwrap());
        assert_eq!(r.get("What"), Some("Bird"));
        assert_eq!(r.get("Count"), Some("3"));
        assert_eq!(r.get("Seen"), Some("true"));
        assert_eq!(r.get("Notes"), Some(""));
    }
}
