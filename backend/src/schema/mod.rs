//! Dataset schemas.
//!
//! A dataset describes its columns with a Frictionless Table Schema stored
//! at `data_package.resources[0].schema`. Besides the standard `type`,
//! `format` and `constraints`, a field may carry a `biosys.type` tag naming
//! the role it plays for observations (date, coordinates, species).

mod cast;
pub mod validator;

pub use cast::{parse_date, parse_datetime, ObservationDate};
pub use validator::{get_record_validator_for_dataset, RecordValidator, RecordValidatorResult};

use crate::geometry::{self, GeometryError};
use crate::import::Row;
use biosys_common::model::dataset::{Dataset, DatasetType};
use biosys_common::model::geometry::Point;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("the data package has no resources[0].schema")]
    MissingSchema,
    #[error("invalid schema: {0}")]
    Invalid(String),
    #[error("field '{field}' has unsupported type '{kind}'")]
    UnsupportedType { field: String, kind: String },
    #[error("field '{field}' has unsupported biosys type '{kind}'")]
    UnsupportedRole { field: String, kind: String },
    #[error("field '{field}' has an invalid pattern: {message}")]
    Pattern { field: String, message: String },
    #[error("{dataset_type} datasets need {requirement}")]
    MissingField {
        dataset_type: DatasetType,
        requirement: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Date,
    Datetime,
}

impl FieldType {
    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "string" => Some(FieldType::String),
            "integer" => Some(FieldType::Integer),
            "number" => Some(FieldType::Number),
            "boolean" => Some(FieldType::Boolean),
            "date" => Some(FieldType::Date),
            "datetime" => Some(FieldType::Datetime),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
        }
    }
}

/// Role of a field in an observation, from its `biosys.type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiosysType {
    ObservationDate,
    Latitude,
    Longitude,
    Datum,
    SpeciesName,
    SpeciesNameId,
}

impl BiosysType {
    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "observationDate" => Some(BiosysType::ObservationDate),
            "latitude" => Some(BiosysType::Latitude),
            "longitude" => Some(BiosysType::Longitude),
            "datum" => Some(BiosysType::Datum),
            "speciesName" => Some(BiosysType::SpeciesName),
            "speciesNameId" => Some(BiosysType::SpeciesNameId),
            _ => None,
        }
    }

    /// Field names that play this role when no field is tagged.
    fn conventional_names(&self) -> &'static [&'static str] {
        match self {
            BiosysType::ObservationDate => &["observation date", "date"],
            BiosysType::Latitude => &["latitude", "lat"],
            BiosysType::Longitude => &["longitude", "long", "lon"],
            BiosysType::Datum => &["datum"],
            BiosysType::SpeciesName => &["species name"],
            BiosysType::SpeciesNameId => &["name id"],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Constraints {
    pub required: bool,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub enum_values: Option<Vec<String>>,
    pub pattern: Option<Regex>,
}

#[derive(Debug, Clone)]
pub struct SchemaField {
    pub name: String,
    pub field_type: FieldType,
    pub format: Option<String>,
    pub constraints: Constraints,
    pub biosys: Option<BiosysType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub fields: Vec<String>,
    pub resource: String,
    pub reference_fields: Vec<String>,
}

/// A foreign key to a model: the row column holding the value and the model
/// field it is matched against.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelForeignKey {
    pub data_field: String,
    pub model_field: String,
}

#[derive(Debug, Clone)]
pub struct DatasetSchema {
    fields: Vec<SchemaField>,
    foreign_keys: Vec<ForeignKey>,
}

#[derive(Deserialize)]
struct RawSchema {
    #[serde(default)]
    fields: Vec<RawField>,
    #[serde(default, rename = "foreignKeys")]
    foreign_keys: Vec<RawForeignKey>,
}

fn default_type() -> String {
    "string".to_string()
}

#[derive(Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type", default = "default_type")]
    kind: String,
    format: Option<String>,
    #[serde(default)]
    constraints: RawConstraints,
    biosys: Option<RawBiosys>,
}

#[derive(Deserialize, Default)]
struct RawConstraints {
    #[serde(default)]
    required: bool,
    minimum: Option<Value>,
    maximum: Option<Value>,
    #[serde(rename = "enum")]
    enum_values: Option<Vec<Value>>,
    pattern: Option<String>,
}

#[derive(Deserialize)]
struct RawBiosys {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Deserialize)]
struct RawForeignKey {
    fields: OneOrMany,
    reference: RawReference,
}

#[derive(Deserialize)]
struct RawReference {
    resource: String,
    fields: OneOrMany,
}

fn number_constraint(value: Option<Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl SchemaField {
    fn from_raw(raw: RawField) -> Result<Self, SchemaError> {
        let field_type =
            FieldType::parse(&raw.kind).ok_or_else(|| SchemaError::UnsupportedType {
                field: raw.name.clone(),
                kind: raw.kind.clone(),
            })?;
        let biosys = match raw.biosys.and_then(|b| b.kind) {
            Some(kind) => Some(BiosysType::parse(&kind).ok_or_else(|| {
                SchemaError::UnsupportedRole {
                    field: raw.name.clone(),
                    kind,
                }
            })?),
            None => None,
        };
        let pattern = raw
            .constraints
            .pattern
            .map(|p| {
                Regex::new(&format!("^(?:{p})$")).map_err(|e| SchemaError::Pattern {
                    field: raw.name.clone(),
                    message: e.to_string(),
                })
            })
            .transpose()?;
        Ok(SchemaField {
            name: raw.name,
            field_type,
            format: raw.format,
            constraints: Constraints {
                required: raw.constraints.required,
                minimum: number_constraint(raw.constraints.minimum),
                maximum: number_constraint(raw.constraints.maximum),
                enum_values: raw
                    .constraints
                    .enum_values
                    .map(|values| values.iter().map(value_text).collect()),
                pattern,
            },
            biosys,
        })
    }

    pub fn is_required(&self) -> bool {
        self.constraints.required
    }
}

impl DatasetSchema {
    /// Reads the schema of the first resource of a data package.
    pub fn from_data_package(data_package: &Value) -> Result<Self, SchemaError> {
        let schema = data_package
            .pointer("/resources/0/schema")
            .ok_or(SchemaError::MissingSchema)?;
        let raw: RawSchema = serde_json::from_value(schema.clone())
            .map_err(|e| SchemaError::Invalid(e.to_string()))?;
        let fields = raw
            .fields
            .into_iter()
            .map(SchemaField::from_raw)
            .collect::<Result<Vec<_>, _>>()?;
        let foreign_keys = raw
            .foreign_keys
            .into_iter()
            .map(|fk| ForeignKey {
                fields: fk.fields.into(),
                resource: fk.reference.resource,
                reference_fields: fk.reference.fields.into(),
            })
            .collect();
        Ok(DatasetSchema {
            fields,
            foreign_keys,
        })
    }

    /// Parses the dataset's schema and checks it declares what its type needs.
    pub fn for_dataset(dataset: &Dataset) -> Result<Self, SchemaError> {
        let schema = Self::from_data_package(&dataset.data_package)?;
        schema.check_type(dataset.dataset_type)?;
        Ok(schema)
    }

    pub fn check_type(&self, dataset_type: DatasetType) -> Result<(), SchemaError> {
        let missing = |requirement| SchemaError::MissingField {
            dataset_type,
            requirement,
        };
        if dataset_type.is_observation() {
            if self.special_field(BiosysType::ObservationDate).is_none() {
                return Err(missing("an observation date field"));
            }
            let has_coordinates = self.special_field(BiosysType::Latitude).is_some()
                && self.special_field(BiosysType::Longitude).is_some();
            if !has_coordinates && self.get_fk_for_model("Site").is_none() {
                return Err(missing("latitude and longitude fields or a site foreign key"));
            }
        }
        if dataset_type == DatasetType::SpeciesObservation
            && self.special_field(BiosysType::SpeciesName).is_none()
            && self.special_field(BiosysType::SpeciesNameId).is_none()
        {
            return Err(missing("a species name or species name id field"));
        }
        Ok(())
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The field tagged with `role`, or else the first one with a
    /// conventional name for it.
    pub fn special_field(&self, role: BiosysType) -> Option<&SchemaField> {
        self.fields
            .iter()
            .find(|f| f.biosys == Some(role))
            .or_else(|| {
                self.fields.iter().find(|f| {
                    f.biosys.is_none()
                        && role
                            .conventional_names()
                            .iter()
                            .any(|n| f.name.trim().eq_ignore_ascii_case(n))
                })
            })
    }

    pub fn get_fk_for_model(&self, model: &str) -> Option<ModelForeignKey> {
        self.foreign_keys
            .iter()
            .find(|fk| fk.resource.eq_ignore_ascii_case(model))
            .and_then(|fk| {
                Some(ModelForeignKey {
                    data_field: fk.fields.first()?.clone(),
                    model_field: fk
                        .reference_fields
                        .first()
                        .cloned()
                        .unwrap_or_else(|| "code".to_string()),
                })
            })
    }

    fn special_value<'r>(&self, row: &'r Row, role: BiosysType) -> Option<&'r str> {
        let field = self.special_field(role)?;
        row.get(&field.name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// `Ok(None)` when the row has no observation date.
    pub fn cast_record_observation_date(
        &self,
        row: &Row,
    ) -> Result<Option<ObservationDate>, String> {
        let Some(field) = self.special_field(BiosysType::ObservationDate) else {
            return Ok(None);
        };
        let Some(value) = self.special_value(row, BiosysType::ObservationDate) else {
            return Ok(None);
        };
        let format = field.format.as_deref();
        let parsed = match field.field_type {
            FieldType::Date => parse_date(value, format).map(ObservationDate::from_date),
            FieldType::Datetime => parse_datetime(value, format),
            _ => parse_datetime(value, Some("any")),
        };
        parsed
            .map(Some)
            .ok_or_else(|| format!("Invalid observation date '{value}'"))
    }

    /// Point from the latitude/longitude fields. `Ok(None)` when both are
    /// blank or the schema has no such fields.
    pub fn cast_geometry(&self, row: &Row, default_srid: i32) -> Result<Option<Point>, GeometryError> {
        let latitude = self.special_value(row, BiosysType::Latitude);
        let longitude = self.special_value(row, BiosysType::Longitude);
        let (latitude, longitude) = match (latitude, longitude) {
            (None, None) => return Ok(None),
            (Some(lat), Some(lon)) => (lat, lon),
            (None, Some(_)) => return Err(GeometryError::Missing("latitude")),
            (Some(_), None) => return Err(GeometryError::Missing("longitude")),
        };
        let srid = match self.special_value(row, BiosysType::Datum) {
            Some(datum) => geometry::datum_to_srid(datum)?,
            None => default_srid,
        };
        geometry::point_from_lat_lon(
            geometry::parse_coordinate("latitude", latitude)?,
            geometry::parse_coordinate("longitude", longitude)?,
            srid,
        )
        .map(Some)
    }

    pub fn cast_species_name(&self, row: &Row) -> Option<String> {
        self.special_value(row, BiosysType::SpeciesName)
            .map(str::to_string)
    }

    pub fn cast_species_name_id(&self, row: &Row) -> Result<Option<i64>, String> {
        self.special_value(row, BiosysType::SpeciesNameId)
            .map(|v| {
                v.parse::<i64>()
                    .map_err(|_| format!("Invalid species name id '{v}'"))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{data_package, row};
    use rstest::rstest;
    use serde_json::json;

    fn observation_fields() -> Value {
        json!([
            {"name": "What", "type": "string", "constraints": {"required": true}},
            {"name": "When", "type": "date", "format": "any", "biosys": {"type": "observationDate"}},
            {"name": "Latitude", "type": "number"},
            {"name": "Longitude", "type": "number"},
        ])
    }

    #[rstest]
    fn parses_fields_and_roles() {
        let schema = DatasetSchema::from_data_package(&data_package(observation_fields())).unwrap();
        assert_eq!(schema.fields().len(), 4);
        assert!(schema.field("What").unwrap().is_required());
        assert_eq!(
            schema.special_field(BiosysType::ObservationDate).unwrap().name,
            "When"
        );
        assert_eq!(
            schema.special_field(BiosysType::Latitude).unwrap().field_type,
            FieldType::Number
        );
        schema.check_type(DatasetType::Observation).unwrap();
    }

    #[rstest]
    fn missing_schema_is_an_error() {
        assert!(matches!(
            DatasetSchema::from_data_package(&json!({"resources": []})),
            Err(SchemaError::MissingSchema)
        ));
    }

    #[rstest]
    fn unknown_types_are_rejected() {
        let package = data_package(json!([{"name": "Shape", "type": "geojson"}]));
        assert!(matches!(
            DatasetSchema::from_data_package(&package),
            Err(SchemaError::UnsupportedType { .. })
        ));
    }

    #[rstest]
    #[case(DatasetType::Generic, true)]
    #[case(DatasetType::Observation, false)]
    #[case(DatasetType::SpeciesObservation, false)]
    fn type_requirements(#[case] dataset_type: DatasetType, #[case] ok: bool) {
        let schema =
            DatasetSchema::from_data_package(&data_package(json!([{"name": "What"}]))).unwrap();
        assert_eq!(schema.check_type(dataset_type).is_ok(), ok);
    }

    #[rstest]
    fn species_datasets_need_a_species_field() {
        let schema = DatasetSchema::from_data_package(&data_package(observation_fields())).unwrap();
        assert!(schema.check_type(DatasetType::SpeciesObservation).is_err());
    }

    #[rstest]
    fn site_foreign_key_replaces_coordinates() {
        let package = json!({"resources": [{"name": "obs", "schema": {
            "fields": [{"name": "Date", "type": "date"}, {"name": "Site Code"}],
            "foreignKeys": [{"fields": "Site Code", "reference": {"resource": "Site", "fields": ["code"]}}]
        }}]});
        let schema = DatasetSchema::from_data_package(&package).unwrap();
        assert_eq!(
            schema.get_fk_for_model("Site"),
            Some(ModelForeignKey {
                data_field: "Site Code".into(),
                model_field: "code".into()
            })
        );
        schema.check_type(DatasetType::Observation).unwrap();
    }

    #[rstest]
    fn casts_observation_values() {
        let schema = DatasetSchema::from_data_package(&data_package(observation_fields())).unwrap();
        let r = row(
            &["What", "When", "Latitude", "Longitude"],
            &["Bird", "21/03/2018", "-31.9", "115.8"],
        );
        let date = schema.cast_record_observation_date(&r).unwrap().unwrap();
        assert_eq!(
            date,
            ObservationDate::from_date(chrono::NaiveDate::from_ymd_opt(2018, 3, 21).unwrap())
        );
        assert_eq!(
            schema.cast_geometry(&r, 4326).unwrap(),
            Some(Point::new(4326, 115.8, -31.9))
        );
    }

    #[rstest]
    fn blank_coordinates_cast_to_none() {
        let schema = DatasetSchema::from_data_package(&data_package(observation_fields())).unwrap();
        let r = row(&["What", "Latitude", "Longitude"], &["Bird", "", ""]);
        assert_eq!(schema.cast_geometry(&r, 4326), Ok(None));
        let r = row(&["Latitude"], &["-31"]);
        assert_eq!(
            schema.cast_geometry(&r, 4326),
            Err(GeometryError::Missing("longitude"))
        );
    }
}
