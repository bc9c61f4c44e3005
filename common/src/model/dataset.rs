use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The kind of records a dataset holds. Observation types carry a date and
/// a location; species observations also carry a species name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetType {
    Generic,
    Observation,
    SpeciesObservation,
}

impl DatasetType {
    pub const ALL: [DatasetType; 3] = [
        DatasetType::Generic,
        DatasetType::Observation,
        DatasetType::SpeciesObservation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetType::Generic => "generic",
            DatasetType::Observation => "observation",
            DatasetType::SpeciesObservation => "species_observation",
        }
    }

    /// True for both observation types.
    pub fn is_observation(&self) -> bool {
        matches!(
            self,
            DatasetType::Observation | DatasetType::SpeciesObservation
        )
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatasetType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown dataset type '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: i64,
    pub project: i64,
    pub name: String,
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub dataset_type: DatasetType,
    pub description: String,
    /// Frictionless data package; the record schema lives at
    /// `resources[0].schema`.
    pub data_package: Value,
}
