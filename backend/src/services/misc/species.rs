use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::species::SpeciesTable;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SpeciesQuery {
    search: Option<String>,
}

/// Names known to the species authority, optionally filtered by a
/// case-insensitive substring.
pub async fn process(
    state: web::Data<AppState>,
    _: CurrentUser,
    query: web::Query<SpeciesQuery>,
) -> ApiResult<HttpResponse> {
    let species = state.species.clone();
    let table = tokio::task::spawn_blocking(move || SpeciesTable::load(species.as_ref())).await??;
    Ok(HttpResponse::Ok().json(table.search(query.search.as_deref())))
}
