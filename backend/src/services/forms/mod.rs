//! Endpoints under `/api/forms`: data-entry layouts bound to a dataset.

mod crud;

use actix_web::web::{delete, get, post, resource, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/forms";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .service(resource("").route(get().to(crud::list)).route(post().to(crud::create)))
        .service(
            resource("/{id}")
                .route(get().to(crud::detail))
                .route(delete().to(crud::destroy)),
        )
}
