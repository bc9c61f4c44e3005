use crate::auth::{ensure_custodian, Authenticated};
use crate::db::{datasets, forms};
use crate::error::{ApiResult, AppError};
use crate::services::{connect, no_content, DatasetFilter};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use biosys_common::requests::FormRequest;

pub async fn list(
    state: web::Data<AppState>,
    _: Authenticated,
    filter: web::Query<DatasetFilter>,
) -> ApiResult<HttpResponse> {
    let conn = connect(&state)?;
    Ok(HttpResponse::Ok().json(forms::list(&conn, filter.dataset)?))
}

pub async fn detail(
    state: web::Data<AppState>,
    _: Authenticated,
    id: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let conn = connect(&state)?;
    let form = forms::get(&conn, id)?.ok_or_else(|| AppError::not_found("Form", id))?;
    Ok(HttpResponse::Ok().json(form))
}

pub async fn create(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    payload: web::Json<FormRequest>,
) -> ApiResult<HttpResponse> {
    let conn = connect(&state)?;
    let dataset =
        datasets::get(&conn, payload.dataset)?.ok_or_else(|| AppError::not_found("Dataset", payload.dataset))?;
    ensure_custodian(&conn, &user, dataset.project)?;
    let form = forms::insert(&conn, &payload)?;
    Ok(HttpResponse::Created().json(form))
}

pub async fn destroy(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    id: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let conn = connect(&state)?;
    let form = forms::get(&conn, id)?.ok_or_else(|| AppError::not_found("Form", id))?;
    let dataset =
        datasets::get(&conn, form.dataset)?.ok_or_else(|| AppError::not_found("Dataset", form.dataset))?;
    ensure_custodian(&conn, &user, dataset.project)?;
    forms::delete(&conn, id)?;
    Ok(no_content())
}
