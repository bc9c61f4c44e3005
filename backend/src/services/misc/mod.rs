//! Endpoints outside the resource scopes: `whoami`, `statistics`,
//! `species` and `form-hierarchy`.

mod form_hierarchy;
mod species;
mod statistics;
mod whoami;

use actix_web::web::{self, get, resource};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(resource("/api/whoami").route(get().to(whoami::process)))
        .service(resource("/api/statistics").route(get().to(statistics::process)))
        .service(resource("/api/species").route(get().to(species::process)))
        .service(resource("/api/form-hierarchy").route(get().to(form_hierarchy::process)));
}
