use crate::audit::{Action, Revision};
use crate::auth::{ensure_custodian, Authenticated};
use crate::db::{datasets, projects};
use crate::error::{ApiResult, AppError};
use crate::schema::DatasetSchema;
use crate::services::{connect, no_content, save_revision, ProjectFilter};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use biosys_common::requests::DatasetRequest;
use log::info;
use rusqlite::Connection;

/// The data package must describe a schema fit for the dataset type.
fn check_request(conn: &Connection, req: &DatasetRequest) -> ApiResult<()> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("name: This field may not be blank.".into()));
    }
    projects::get(conn, req.project)?.ok_or_else(|| AppError::not_found("Project", req.project))?;
    DatasetSchema::from_data_package(&req.data_package)?.check_type(req.dataset_type)?;
    Ok(())
}

pub async fn list(
    state: web::Data<AppState>,
    _: Authenticated,
    filter: web::Query<ProjectFilter>,
) -> ApiResult<HttpResponse> {
    let conn = connect(&state)?;
    Ok(HttpResponse::Ok().json(datasets::list(&conn, filter.project)?))
}

pub async fn detail(
    state: web::Data<AppState>,
    _: Authenticated,
    id: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let conn = connect(&state)?;
    let dataset = datasets::get(&conn, id)?.ok_or_else(|| AppError::not_found("Dataset", id))?;
    Ok(HttpResponse::Ok().json(dataset))
}

pub async fn create(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    payload: web::Json<DatasetRequest>,
) -> ApiResult<HttpResponse> {
    let conn = connect(&state)?;
    check_request(&conn, &payload)?;
    ensure_custodian(&conn, &user, payload.project)?;
    let dataset = datasets::insert(&conn, &payload)?;
    info!("{} dataset {} '{}' created", dataset.dataset_type, dataset.id, dataset.name);

    let mut revision = Revision::new(Some(user.id), "dataset created");
    revision.record("datasets", dataset.id, Action::Created, &dataset);
    save_revision(&state, revision);
    Ok(HttpResponse::Created().json(dataset))
}

pub async fn update(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    id: web::Path<i64>,
    payload: web::Json<DatasetRequest>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let conn = connect(&state)?;
    let existing = datasets::get(&conn, id)?.ok_or_else(|| AppError::not_found("Dataset", id))?;
    check_request(&conn, &payload)?;
    ensure_custodian(&conn, &user, existing.project)?;
    if payload.project != existing.project {
        ensure_custodian(&conn, &user, payload.project)?;
    }
    let dataset = datasets::update(&conn, id, &payload)?.ok_or_else(|| AppError::not_found("Dataset", id))?;

    let mut revision = Revision::new(Some(user.id), "dataset updated");
    revision.record("datasets", id, Action::Updated, &dataset);
    save_revision(&state, revision);
    Ok(HttpResponse::Ok().json(dataset))
}

pub async fn destroy(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    id: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let conn = connect(&state)?;
    let dataset = datasets::get(&conn, id)?.ok_or_else(|| AppError::not_found("Dataset", id))?;
    ensure_custodian(&conn, &user, dataset.project)?;
    datasets::delete(&conn, id)?;

    let mut revision = Revision::new(Some(user.id), "dataset deleted");
    revision.record("datasets", id, Action::Deleted, &dataset);
    save_revision(&state, revision);
    Ok(no_content())
}
