//! # Media Service Module
//!
//! Files attached to records, under `/api/media`. Files are stored below the
//! media root as `project_{p}/dataset_{d}/record_{r}/{md5}_{file_name}`.
//!
//! ## Sub-modules:
//! - `crud`: list, attach (base64 JSON payload), retrieve and delete.
//! - `file`: serves the stored bytes with a content type guessed from the
//!   file name.

mod crud;
mod file;

use actix_web::web::{delete, get, post, resource, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/media";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .service(resource("").route(get().to(crud::list)).route(post().to(crud::create)))
        .service(
            resource("/{id}")
                .route(get().to(crud::detail))
                .route(delete().to(crud::destroy)),
        )
        .service(resource("/{id}/file").route(get().to(file::process)))
}
