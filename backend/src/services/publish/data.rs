use crate::auth::Authenticated;
use crate::db::{datasets, records};
use crate::error::{ApiResult, AppError};
use crate::services::connect;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::{json, Value};

/// `{"data": [...]}` with the data of every record of the dataset and its
/// id under `_id`.
pub async fn process(
    state: web::Data<AppState>,
    _: Authenticated,
    dataset_id: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let dataset_id = dataset_id.into_inner();
    let conn = connect(&state)?;
    datasets::get(&conn, dataset_id)?.ok_or_else(|| AppError::not_found("Dataset", dataset_id))?;
    let data: Vec<Value> = records::list(&conn, Some(dataset_id))?
        .iter()
        .map(|r| Value::Object(r.data_with_id()))
        .collect();
    Ok(HttpResponse::Ok().json(json!({ "data": data })))
}
