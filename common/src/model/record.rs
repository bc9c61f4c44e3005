use crate::model::geometry::Point;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row of a dataset. Records built in dry-run mode have no `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Option<i64>,
    pub dataset: i64,
    pub site: Option<i64>,
    /// Row values after casting by the dataset schema.
    pub data: Map<String, Value>,
    /// Observation date localised in the project time zone.
    pub datetime: Option<DateTime<FixedOffset>>,
    pub geometry: Option<Point>,
    pub species_name: Option<String>,
    /// Name-authority id of `species_name`, `-1` when it could not be matched.
    pub name_id: Option<i64>,
    pub client_id: Option<String>,
    /// Where the record came from, e.g. `{"file_name": "survey.csv", "row": 4}`.
    pub source_info: Option<Value>,
}

impl Record {
    /// The record data with its id under `_id`, as used by the publish view.
    pub fn data_with_id(&self) -> Map<String, Value> {
        let mut data = self.data.clone();
        data.insert("_id".to_string(), self.id.map_or(Value::Null, Value::from));
        data
    }
}
