use crate::model::geometry::Point;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub project: i64,
    pub parent_site: Option<i64>,
    /// Unique within the project.
    pub code: String,
    pub name: String,
    pub comments: String,
    pub geometry: Option<Point>,
    /// Free-form values, typically the uploaded columns that are not part of
    /// the site column map.
    pub attributes: Map<String, Value>,
}

impl Site {
    /// Label used by the form hierarchy, `name (code)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.code)
    }
}
