//! Command-line and environment configuration.
//!
//! Every option can be given as a flag or through its `BIOSYS_*` variable.
//! With no subcommand the server is started.

use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "biosys", version, about = "Biodiversity data management service")]
pub struct Config {
    /// Address the HTTP server binds to.
    #[arg(long, env = "BIOSYS_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "BIOSYS_PORT", default_value_t = 8080)]
    pub port: u16,

    /// SQLite database file, created on first start.
    #[arg(long, env = "BIOSYS_DATABASE", default_value = "biosys.sqlite")]
    pub database: PathBuf,

    /// Directory where media files attached to records are stored.
    #[arg(long, env = "BIOSYS_MEDIA_ROOT", default_value = "media")]
    pub media_root: PathBuf,

    /// CSV species list (`name`, `name_id`) used as the name authority.
    /// Without it every species name is unmatched.
    #[arg(long, env = "BIOSYS_SPECIES_FILE")]
    pub species_file: Option<PathBuf>,

    /// Time zone for observation dates of projects that declare none.
    #[arg(long, env = "BIOSYS_TIME_ZONE", default_value = "Australia/Perth")]
    pub time_zone: String,

    /// Upper bound for JSON bodies and uploaded files, in megabytes.
    #[arg(long, env = "BIOSYS_MAX_UPLOAD_MB", default_value_t = 10)]
    pub max_upload_mb: usize,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Create an API user and print its token.
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        #[arg(long)]
        superuser: bool,
    },
}

impl Config {
    pub fn default_time_zone(&self) -> Result<Tz, String> {
        self.time_zone
            .parse::<Tz>()
            .map_err(|e| format!("invalid time zone '{}': {}", self.time_zone, e))
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}
