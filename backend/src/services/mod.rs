//! # HTTP services
//!
//! Every resource lives in its own sub-module exposing a
//! `configure_routes() -> Scope`; [`configure`] mounts them all. Routes are
//! declared as resources so a known path called with an unsupported method
//! answers 405.
//!
//! ## Sub-modules
//! - `projects`: projects and the site upload (`/api/projects`).
//! - `sites`, `datasets`, `records`, `forms`, `media`: CRUD endpoints,
//!   writes restricted to project custodians.
//! - `datasets` also hosts the record upload.
//! - `misc`: `whoami`, `statistics`, `species` and the form hierarchy.
//! - `publish`: read-only dataset export under `/publish`.

mod datasets;
mod forms;
mod media;
mod misc;
mod projects;
mod publish;
mod records;
mod sites;
mod upload;

use crate::audit::Revision;
use crate::error::{ApiResult, AppError};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use rusqlite::Connection;
use serde::Deserialize;

pub fn configure(cfg: &mut web::ServiceConfig) {
    misc::configure(cfg);
    cfg.service(projects::configure_routes())
        .service(sites::configure_routes())
        .service(datasets::configure_routes())
        .service(records::configure_routes())
        .service(forms::configure_routes())
        .service(media::configure_routes())
        .service(publish::configure_routes());
}

/// JSON body configuration with errors rendered like every other API error.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _| AppError::BadRequest(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _| AppError::BadRequest(err.to_string()).into())
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _| AppError::NotFound(err.to_string()).into())
}

pub(crate) fn connect(state: &AppState) -> ApiResult<Connection> {
    Ok(state.db.connect()?)
}

/// Writes the request's revision once the data work is done. Failures are
/// logged by [`Revision::save`] and never reach the client.
pub(crate) fn save_revision(state: &AppState, revision: Revision) {
    revision.save(&state.db);
}

/// Fallback for unknown paths, so they get a JSON body too.
pub async fn not_found() -> ApiResult<HttpResponse> {
    Err(AppError::NotFound("Page".into()))
}

pub(crate) fn no_content() -> HttpResponse {
    HttpResponse::NoContent().finish()
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProjectFilter {
    pub project: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DatasetFilter {
    pub dataset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RecordFilter {
    pub record: Option<i64>,
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers for the HTTP tests of the sub-modules.

    use super::*;
    use crate::db::Database;
    use crate::test_support::app_state;
    use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
    use actix_web::test::TestRequest;
    use actix_web::App;

    pub fn test_app(
        db: Database,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        let state = app_state(db);
        let limit = state.max_upload_bytes;
        App::new()
            .app_data(web::Data::new(state))
            .app_data(json_config(limit))
            .app_data(query_config())
            .app_data(path_config())
            .configure(configure)
            .default_service(web::route().to(not_found))
    }

    pub fn authorized(req: TestRequest, token: &str) -> TestRequest {
        req.insert_header(("Authorization", format!("Token {token}")))
    }

    /// A multipart body holding one `file` part.
    pub fn multipart(file_name: &str, content_type: &str, content: &[u8]) -> (String, Vec<u8>) {
        let boundary = "----biosys-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={boundary}"), body)
    }
}
