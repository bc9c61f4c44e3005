//! Species-name authority.
//!
//! Imports resolve species names to stable numeric ids through a
//! [`SpeciesFacade`]. The lookup table is fetched once per import run and
//! kept in a [`SpeciesTable`] for the duration of the batch.

use biosys_common::model::species::Species;
use log::debug;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Id stored on a species observation whose name is not in the table.
pub const UNMATCHED_NAME_ID: i64 = -1;

const NAME_COLUMNS: [&str; 3] = ["name", "species_name", "species name"];
const ID_COLUMNS: [&str; 4] = ["name_id", "nameid", "name id", "id"];

#[derive(Debug, Error)]
pub enum SpeciesError {
    #[error("species list unavailable: {0}")]
    Unavailable(String),
    #[error("invalid species list: {0}")]
    Csv(#[from] csv::Error),
}

pub trait SpeciesFacade: Send + Sync {
    fn name_id_by_species_name(&self) -> Result<HashMap<String, i64>, SpeciesError>;
}

/// Species list read from a CSV file with a name and a name-id column.
pub struct CsvSpeciesFacade {
    path: PathBuf,
}

impl CsvSpeciesFacade {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvSpeciesFacade { path: path.into() }
    }
}

fn column_index(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.contains(&h.trim().to_lowercase().as_str()))
}

impl SpeciesFacade for CsvSpeciesFacade {
    fn name_id_by_species_name(&self) -> Result<HashMap<String, i64>, SpeciesError> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let headers = reader.headers()?.clone();
        let (name_idx, id_idx) = match (
            column_index(&headers, &NAME_COLUMNS),
            column_index(&headers, &ID_COLUMNS),
        ) {
            (Some(name), Some(id)) => (name, id),
            _ => {
                return Err(SpeciesError::Unavailable(format!(
                    "{} needs a name and a name_id column",
                    self.path.display()
                )))
            }
        };

        let mut names = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let name = record.get(name_idx).unwrap_or_default().trim();
            let id = record.get(id_idx).unwrap_or_default().trim();
            match id.parse::<i64>() {
                Ok(id) if !name.is_empty() => {
                    names.insert(name.to_string(), id);
                }
                _ => debug!("skipping species list entry '{}' / '{}'", name, id),
            }
        }
        Ok(names)
    }
}

/// In-memory species list.
#[derive(Debug, Clone, Default)]
pub struct StaticSpeciesFacade {
    names: HashMap<String, i64>,
}

impl StaticSpeciesFacade {
    pub fn new<S: Into<String>>(species: impl IntoIterator<Item = (S, i64)>) -> Self {
        StaticSpeciesFacade {
            names: species.into_iter().map(|(n, id)| (n.into(), id)).collect(),
        }
    }
}

impl SpeciesFacade for StaticSpeciesFacade {
    fn name_id_by_species_name(&self) -> Result<HashMap<String, i64>, SpeciesError> {
        Ok(self.names.clone())
    }
}

/// Both directions of the name authority for one import run.
#[derive(Debug, Clone, Default)]
pub struct SpeciesTable {
    id_by_name: HashMap<String, i64>,
    name_by_id: HashMap<i64, String>,
}

impl SpeciesTable {
    pub fn load(facade: &dyn SpeciesFacade) -> Result<Self, SpeciesError> {
        let id_by_name = facade.name_id_by_species_name()?;
        let name_by_id = id_by_name
            .iter()
            .map(|(name, id)| (*id, name.clone()))
            .collect();
        Ok(SpeciesTable {
            id_by_name,
            name_by_id,
        })
    }

    pub fn name_id(&self, name: &str) -> i64 {
        self.id_by_name
            .get(name)
            .copied()
            .unwrap_or(UNMATCHED_NAME_ID)
    }

    pub fn species_name(&self, name_id: i64) -> Option<&str> {
        self.name_by_id.get(&name_id).map(String::as_str)
    }

    /// Species whose name contains `query` (case-insensitive), sorted by name.
    pub fn search(&self, query: Option<&str>) -> Vec<Species> {
        let query = query.map(str::to_lowercase);
        let mut species: Vec<Species> = self
            .id_by_name
            .iter()
            .filter(|(name, _)| {
                query
                    .as_deref()
                    .map_or(true, |q| name.to_lowercase().contains(q))
            })
            .map(|(name, id)| Species {
                name: name.clone(),
                name_id: *id,
            })
            .collect();
        species.sort_by(|a, b| a.name.cmp(&b.name));
        species
    }
}
