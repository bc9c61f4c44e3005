use super::{ImportError, Row};
use crate::db::{records, sites};
use crate::error::AppError;
use crate::geometry::MODEL_SRID;
use crate::schema::{
    get_record_validator_for_dataset, ModelForeignKey, ObservationDate, RecordValidator,
    RecordValidatorResult,
};
use crate::species::{SpeciesFacade, SpeciesTable};
use biosys_common::model::dataset::{Dataset, DatasetType};
use biosys_common::model::project::Project;
use biosys_common::model::record::Record;
use biosys_common::model::site::Site;
use chrono::{DateTime, FixedOffset, TimeZone};
use chrono_tz::Tz;
use log::{debug, warn};
use rusqlite::Connection;
use serde_json::{json, Map};

/// Result for one row. `record` is `None` when the row failed, the reasons
/// being in `result.errors`.
#[derive(Debug)]
pub struct RecordOutcome {
    pub row: usize,
    pub record: Option<Record>,
    pub result: RecordValidatorResult,
}

/// Builds the records of one dataset from a sequence of rows.
///
/// Nothing is written unless [`commit`](Self::commit) is on, except the
/// sites created for unknown site codes when
/// [`create_site`](Self::create_site) is on. Sites referenced by name or id
/// are never created. Callers doing a dry run roll those back with the
/// enclosing transaction.
pub struct RecordCreator<'a, I> {
    conn: &'a Connection,
    dataset: &'a Dataset,
    project: &'a Project,
    rows: I,
    validator: RecordValidator,
    species: Option<SpeciesTable>,
    site_fk: Option<ModelForeignKey>,
    time_zone: Tz,
    commit: bool,
    create_site: bool,
    source_file: Option<String>,
    created_sites: Vec<Site>,
}

impl<'a, I> RecordCreator<'a, I>
where
    I: Iterator<Item = Result<Row, ImportError>>,
{
    pub fn new(
        conn: &'a Connection,
        dataset: &'a Dataset,
        project: &'a Project,
        rows: I,
        species: &dyn SpeciesFacade,
        default_time_zone: Tz,
    ) -> Result<Self, AppError> {
        let validator = get_record_validator_for_dataset(dataset)?;
        let species = match dataset.dataset_type {
            DatasetType::SpeciesObservation => Some(SpeciesTable::load(species)?),
            _ => None,
        };
        let time_zone = match project.timezone.as_deref() {
            Some(name) => name.parse::<Tz>().unwrap_or_else(|e| {
                warn!("project {}: {e}, using {default_time_zone}", project.id);
                default_time_zone
            }),
            None => default_time_zone,
        };
        let site_fk = validator.schema().get_fk_for_model("Site");
        Ok(RecordCreator {
            conn,
            dataset,
            project,
            rows,
            validator,
            species,
            site_fk,
            time_zone,
            commit: true,
            create_site: false,
            source_file: None,
            created_sites: Vec::new(),
        })
    }

    pub fn commit(mut self, commit: bool) -> Self {
        self.commit = commit;
        self
    }

    pub fn create_site(mut self, create_site: bool) -> Self {
        self.create_site = create_site;
        self
    }

    /// Name recorded in the `source_info` of every record.
    pub fn source_file(mut self, file_name: impl Into<String>) -> Self {
        self.source_file = Some(file_name.into());
        self
    }

    pub fn created_sites(&self) -> &[Site] {
        &self.created_sites
    }

    fn resolve_site(&mut self, row: &Row) -> Result<Option<Site>, AppError> {
        let Some(fk) = &self.site_fk else {
            return Ok(None);
        };
        let Some(value) = row
            .get(&fk.data_field)
            .map(str::trim)
            .filter(|v| !v.is_empty())
        else {
            return Ok(None);
        };
        if let Some(site) = sites::find_by_field(self.conn, self.project.id, &fk.model_field, value)? {
            return Ok(Some(site));
        }
        // Only a code-keyed lookup that missed proves the code is free.
        if !self.create_site || fk.model_field != "code" {
            return Ok(None);
        }
        debug!("creating site {value} in project {}", self.project.id);
        let attributes = Map::new();
        let site = sites::upsert_by_code(
            self.conn,
            self.project.id,
            value,
            &sites::SiteValues {
                name: "",
                comments: "",
                attributes: &attributes,
                geometry: None,
                parent_site: None,
            },
        )?;
        self.created_sites.push(site.clone());
        Ok(Some(site))
    }

    fn localise(&self, date: ObservationDate) -> Option<DateTime<FixedOffset>> {
        match date {
            ObservationDate::Aware(aware) => Some(aware),
            ObservationDate::Local(naive) => self
                .time_zone
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.fixed_offset()),
        }
    }

    fn set_observation(&self, row: &Row, site: Option<&Site>, record: &mut Record, result: &mut RecordValidatorResult) {
        let schema = self.validator.schema();
        match schema.cast_record_observation_date(row) {
            Ok(Some(date)) => match self.localise(date) {
                Some(datetime) => record.datetime = Some(datetime),
                None => result.add_error(
                    "Observation Date",
                    format!("{date:?} does not exist in time zone {}", self.time_zone),
                ),
            },
            Ok(None) => {}
            Err(message) => result.add_error("Observation Date", message),
        }
        record.geometry = match schema.cast_geometry(row, MODEL_SRID) {
            Ok(Some(point)) => Some(point),
            Ok(None) => site.and_then(|s| s.geometry),
            Err(e) => {
                result.add_error("Geometry", e.to_string());
                return;
            }
        };
        if record.geometry.is_none() {
            result.add_error("Geometry", "The geometry of the record could not be determined");
        }
    }

    fn set_species(&self, row: &Row, record: &mut Record) {
        let Some(table) = &self.species else {
            return;
        };
        let schema = self.validator.schema();
        let name = schema.cast_species_name(row);
        let known_id = schema
            .cast_species_name_id(row)
            .ok()
            .flatten()
            .filter(|id| table.species_name(*id).is_some());
        match (name, known_id) {
            (None, Some(id)) => {
                record.species_name = table.species_name(id).map(str::to_string);
                record.name_id = Some(id);
            }
            (Some(name), known_id) => {
                let matched = table.name_id(&name);
                record.name_id = Some(match known_id {
                    Some(id) if matched == crate::species::UNMATCHED_NAME_ID => id,
                    _ => matched,
                });
                record.species_name = Some(name);
            }
            (None, None) => {}
        }
    }

    fn create(&mut self, row: Row) -> Result<RecordOutcome, AppError> {
        let mut result = self.validator.validate(&row, self.species.as_ref());
        if !result.is_valid() {
            return Ok(RecordOutcome {
                row: row.number(),
                record: None,
                result,
            });
        }
        let site = self.resolve_site(&row)?;
        let mut record = Record {
            id: None,
            dataset: self.dataset.id,
            site: site.as_ref().map(|s| s.id),
            data: result.data.clone(),
            datetime: None,
            geometry: None,
            species_name: None,
            name_id: None,
            client_id: None,
            source_info: self
                .source_file
                .as_ref()
                .map(|f| json!({"file_name": f, "row": row.number()})),
        };
        if self.dataset.dataset_type.is_observation() {
            self.set_observation(&row, site.as_ref(), &mut record, &mut result);
        }
        if self.dataset.dataset_type == DatasetType::SpeciesObservation {
            self.set_species(&row, &mut record);
        }
        if !result.is_valid() {
            return Ok(RecordOutcome {
                row: row.number(),
                record: None,
                result,
            });
        }
        if self.commit {
            record = records::insert(self.conn, &record)?;
        }
        Ok(RecordOutcome {
            row: row.number(),
            record: Some(record),
            result,
        })
    }
}

impl<I> Iterator for RecordCreator<'_, I>
where
    I: Iterator<Item = Result<Row, ImportError>>,
{
    type Item = Result<RecordOutcome, AppError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = match self.rows.next()? {
            Ok(row) => row,
            Err(e) => return Some(Err(e.into())),
        };
        Some(self.create(row))
    }
}
