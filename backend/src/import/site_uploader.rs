use super::Row;
use crate::db::sites::{self, SiteValues};
use crate::geometry::PointParser;
use crate::import::ImportError;
use biosys_common::model::project::Project;
use biosys_common::model::site::Site;
use log::{debug, warn};
use rusqlite::Connection;
use serde_json::{Map, Value};

pub const CODE_COLUMNS: [&str; 2] = ["code", "site code"];
pub const NAME_COLUMNS: [&str; 2] = ["name", "site name"];
pub const COMMENTS_COLUMNS: [&str; 1] = ["comments"];
pub const PARENT_SITE_COLUMNS: [&str; 2] = ["parent site", "parent"];

/// Result for one uploaded row. Exactly one of `site` and `error` is set.
#[derive(Debug)]
pub struct SiteOutcome {
    pub row: usize,
    pub site: Option<Site>,
    pub error: Option<String>,
    /// False when the row updated an existing site.
    pub created: bool,
}

impl SiteOutcome {
    fn error(row: usize, message: impl Into<String>) -> Self {
        SiteOutcome {
            row,
            site: None,
            error: Some(message.into()),
            created: false,
        }
    }
}

fn is_mapped(header: &str) -> bool {
    let header = header.trim();
    CODE_COLUMNS
        .iter()
        .chain(&NAME_COLUMNS)
        .chain(&COMMENTS_COLUMNS)
        .chain(&PARENT_SITE_COLUMNS)
        .any(|alias| header.eq_ignore_ascii_case(alias))
}

/// Creates or updates the sites of one project, one row at a time.
pub struct SiteUploader<'a, I> {
    conn: &'a Connection,
    project: &'a Project,
    rows: I,
}

impl<'a, I> SiteUploader<'a, I>
where
    I: Iterator<Item = Result<Row, ImportError>>,
{
    pub fn new(conn: &'a Connection, project: &'a Project, rows: I) -> Self {
        SiteUploader {
            conn,
            project,
            rows,
        }
    }

    fn parent_site(&self, code: &str) -> rusqlite::Result<i64> {
        if let Some(parent) = sites::find_by_code_any_project(self.conn, code)? {
            return Ok(parent.id);
        }
        debug!("creating parent site {code} in project {}", self.project.id);
        let attributes = Map::new();
        let parent = sites::upsert_by_code(
            self.conn,
            self.project.id,
            code,
            &SiteValues {
                name: "",
                comments: "",
                attributes: &attributes,
                geometry: None,
                parent_site: None,
            },
        )?;
        Ok(parent.id)
    }

    fn upload_row(&self, row: &Row) -> SiteOutcome {
        let Some(code) = row.get_value(&CODE_COLUMNS) else {
            return SiteOutcome::error(row.number(), "Site Code is missing");
        };
        let attributes: Map<String, Value> = row
            .iter()
            .filter(|(header, _)| !header.trim().is_empty() && !is_mapped(header))
            .map(|(header, value)| (header.to_string(), Value::String(value.to_string())))
            .collect();
        let geometry = match PointParser::new(row, self.project.datum).to_geom() {
            Ok(point) => Some(point),
            Err(e) => {
                debug!("row {}: no geometry for site {code}: {e}", row.number());
                None
            }
        };
        let parent_site = match row.get_value(&PARENT_SITE_COLUMNS) {
            Some(parent) => match self.parent_site(parent) {
                Ok(id) => Some(id),
                Err(e) => return SiteOutcome::error(row.number(), e.to_string()),
            },
            None => None,
        };
        let values = SiteValues {
            name: row.get_value(&NAME_COLUMNS).unwrap_or_default(),
            comments: row.get_value(&COMMENTS_COLUMNS).unwrap_or_default(),
            attributes: &attributes,
            geometry,
            parent_site,
        };
        let created = match sites::find_by_field(self.conn, self.project.id, "code", code) {
            Ok(existing) => existing.is_none(),
            Err(e) => return SiteOutcome::error(row.number(), e.to_string()),
        };
        match sites::upsert_by_code(self.conn, self.project.id, code, &values) {
            Ok(site) => SiteOutcome {
                row: row.number(),
                site: Some(site),
                error: None,
                created,
            },
            Err(e) => {
                warn!("row {}: site {code} not saved: {e}", row.number());
                SiteOutcome::error(row.number(), e.to_string())
            }
        }
    }
}

impl<I> Iterator for SiteUploader<'_, I>
where
    I: Iterator<Item = Result<Row, ImportError>>,
{
    /// An `Err` means the file itself could not be read further.
    type Item = Result<SiteOutcome, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = match self.rows.next()? {
            Ok(row) => row,
            Err(e) => return Some(Err(e)),
        };
        Some(Ok(self.upload_row(&row)))
    }
}
