use super::cast::{cast_value, check_constraints};
use super::{BiosysType, DatasetSchema, SchemaError};
use crate::geometry::{GeometryError, MODEL_SRID};
use crate::import::Row;
use crate::species::SpeciesTable;
use biosys_common::model::dataset::{Dataset, DatasetType};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Outcome of validating one row. `data` holds the cast values, keyed like
/// the row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordValidatorResult {
    pub errors: BTreeMap<String, String>,
    pub warnings: BTreeMap<String, String>,
    pub data: Map<String, Value>,
}

impl RecordValidatorResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Keeps the first error reported for a field.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings
            .entry(field.into())
            .or_insert_with(|| message.into());
    }
}

#[derive(Debug, Clone)]
pub struct RecordValidator {
    schema: DatasetSchema,
    dataset_type: DatasetType,
}

pub fn get_record_validator_for_dataset(dataset: &Dataset) -> Result<RecordValidator, SchemaError> {
    Ok(RecordValidator {
        schema: DatasetSchema::for_dataset(dataset)?,
        dataset_type: dataset.dataset_type,
    })
}

impl RecordValidator {
    pub fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    pub fn dataset_type(&self) -> DatasetType {
        self.dataset_type
    }

    /// `species` is only consulted for species observations. Without a
    /// table, name ids are not checked against the authority.
    pub fn validate(&self, row: &Row, species: Option<&SpeciesTable>) -> RecordValidatorResult {
        let mut result = RecordValidatorResult::default();
        self.validate_fields(row, &mut result);
        if self.dataset_type.is_observation() {
            self.validate_observation(row, &mut result);
        }
        if self.dataset_type == DatasetType::SpeciesObservation {
            self.validate_species(row, species, &mut result);
        }
        result
    }

    fn validate_fields(&self, row: &Row, result: &mut RecordValidatorResult) {
        for field in self.schema.fields() {
            let raw = row.get(&field.name).map(str::trim).unwrap_or_default();
            if raw.is_empty() {
                if field.is_required() {
                    result.add_error(&field.name, "This field is required");
                }
                if row.get(&field.name).is_some() {
                    result.data.insert(field.name.clone(), Value::Null);
                }
                continue;
            }
            match cast_value(field, raw).and_then(|v| check_constraints(field, raw, &v).map(|()| v)) {
                Ok(value) => {
                    result.data.insert(field.name.clone(), value);
                }
                Err(message) => {
                    result.add_error(&field.name, message);
                    result.data.insert(field.name.clone(), Value::String(raw.to_string()));
                }
            }
        }
        for (column, value) in row.iter() {
            if column.trim().is_empty() || self.schema.field(column).is_some() {
                continue;
            }
            result.add_warning(column, "Unknown field");
            result.data.insert(column.to_string(), Value::String(value.to_string()));
        }
    }

    fn field_name(&self, role: BiosysType, fallback: &str) -> String {
        self.schema
            .special_field(role)
            .map(|f| f.name.clone())
            .unwrap_or_else(|| fallback.to_string())
    }

    fn validate_observation(&self, row: &Row, result: &mut RecordValidatorResult) {
        let date_field = self.field_name(BiosysType::ObservationDate, "Observation Date");
        match self.schema.cast_record_observation_date(row) {
            Ok(Some(_)) => {}
            Ok(None) => result.add_error(date_field, "Observation date is missing"),
            Err(message) => result.add_error(date_field, message),
        }

        let has_site_fk = self.schema.get_fk_for_model("Site").is_some();
        match self.schema.cast_geometry(row, MODEL_SRID) {
            Ok(Some(_)) => {}
            Ok(None) if has_site_fk => {}
            Ok(None) => result.add_error(
                self.field_name(BiosysType::Latitude, "Latitude"),
                "Latitude and longitude are missing",
            ),
            Err(error) => {
                let field = match &error {
                    GeometryError::Missing("longitude")
                    | GeometryError::NotANumber { field: "longitude", .. }
                    | GeometryError::OutOfRange { field: "longitude", .. } => {
                        self.field_name(BiosysType::Longitude, "Longitude")
                    }
                    GeometryError::UnknownDatum(_) => self.field_name(BiosysType::Datum, "Datum"),
                    _ => self.field_name(BiosysType::Latitude, "Latitude"),
                };
                result.add_error(field, error.to_string());
            }
        }
    }

    fn validate_species(&self, row: &Row, species: Option<&SpeciesTable>, result: &mut RecordValidatorResult) {
        let name = self.schema.cast_species_name(row);
        let id_field = self.field_name(BiosysType::SpeciesNameId, "Name Id");
        let name_id = match self.schema.cast_species_name_id(row) {
            Ok(name_id) => name_id,
            Err(message) => {
                result.add_error(id_field, message);
                return;
            }
        };
        if let (Some(id), Some(table)) = (name_id, species) {
            if table.species_name(id).is_none() {
                result.add_error(id_field, format!("Unknown species name id {id}"));
                return;
            }
        }
        if name.is_none() && name_id.is_none() {
            let field = match self.schema.special_field(BiosysType::SpeciesName) {
                Some(f) => f.name.clone(),
                None => id_field,
            };
            result.add_error(field, "Species name or name id is missing");
        }
    }
}
