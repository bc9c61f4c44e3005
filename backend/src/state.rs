//! Shared application state injected into every handler as `web::Data`.

use crate::db::Database;
use crate::species::SpeciesFacade;
use chrono_tz::Tz;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Species-name authority consulted by species-observation imports.
    pub species: Arc<dyn SpeciesFacade>,
    pub media_root: PathBuf,
    /// Used for projects without a time zone of their own.
    pub time_zone: Tz,
    pub max_upload_bytes: usize,
}
