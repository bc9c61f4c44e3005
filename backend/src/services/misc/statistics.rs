use crate::auth::Authenticated;
use crate::db::{datasets, projects, records, sites};
use crate::error::ApiResult;
use crate::services::connect;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use biosys_common::model::dataset::DatasetType;
use biosys_common::model::statistics::{Statistics, Total, TypedTotal};
use std::collections::HashMap;

fn typed_total(counts: &HashMap<DatasetType, u64>) -> TypedTotal {
    let count = |t| Total {
        total: counts.get(&t).copied().unwrap_or(0),
    };
    TypedTotal {
        total: counts.values().sum(),
        generic: count(DatasetType::Generic),
        observation: count(DatasetType::Observation),
        species_observation: count(DatasetType::SpeciesObservation),
    }
}

pub async fn process(state: web::Data<AppState>, _: Authenticated) -> ApiResult<HttpResponse> {
    let conn = connect(&state)?;
    let statistics = Statistics {
        projects: Total {
            total: projects::count(&conn)?,
        },
        datasets: typed_total(&datasets::count_by_type(&conn)?),
        records: typed_total(&records::count_by_type(&conn)?),
        sites: Total {
            total: sites::count(&conn)?,
        },
    };
    Ok(HttpResponse::Ok().json(statistics))
}
