use crate::audit::{Action, Revision};
use crate::auth::{ensure_custodian, Authenticated};
use crate::db::{datasets, projects, records};
use crate::error::{ApiResult, AppError};
use crate::import::record_creator::RecordCreator;
use crate::import::Row;
use crate::services::{connect, no_content, save_revision, DatasetFilter};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use biosys_common::model::record::Record;
use biosys_common::model::user::User;
use biosys_common::requests::RecordRequest;
use rusqlite::Connection;
use std::iter;

/// Validates the payload like an uploaded row and builds the (unsaved)
/// record. Only custodians of the dataset's project get this far.
fn build_record(state: &AppState, conn: &Connection, user: &User, req: &RecordRequest) -> ApiResult<Record> {
    let dataset = datasets::get(conn, req.dataset)?.ok_or_else(|| AppError::not_found("Dataset", req.dataset))?;
    let project = projects::get(conn, dataset.project)?
        .ok_or_else(|| AppError::not_found("Project", dataset.project))?;
    ensure_custodian(conn, user, project.id)?;

    let row = Row::from_map(&req.data);
    let mut creator = RecordCreator::new(
        conn,
        &dataset,
        &project,
        iter::once(Ok(row)),
        state.species.as_ref(),
        state.time_zone,
    )?
    .commit(false);
    let outcome = creator
        .next()
        .ok_or_else(|| AppError::Internal("no outcome for a single row".into()))??;
    let mut record = outcome.record.ok_or(AppError::Validation(outcome.result.errors))?;
    record.client_id = req.client_id.clone();
    Ok(record)
}

pub async fn list(
    state: web::Data<AppState>,
    _: Authenticated,
    filter: web::Query<DatasetFilter>,
) -> ApiResult<HttpResponse> {
    let conn = connect(&state)?;
    Ok(HttpResponse::Ok().json(records::list(&conn, filter.dataset)?))
}

pub async fn detail(
    state: web::Data<AppState>,
    _: Authenticated,
    id: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let conn = connect(&state)?;
    let record = records::get(&conn, id)?.ok_or_else(|| AppError::not_found("Record", id))?;
    Ok(HttpResponse::Ok().json(record))
}

pub async fn create(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    payload: web::Json<RecordRequest>,
) -> ApiResult<HttpResponse> {
    let conn = connect(&state)?;
    let record = build_record(&state, &conn, &user, &payload)?;
    let record = records::insert(&conn, &record)?;

    let mut revision = Revision::new(Some(user.id), "record created");
    if let Some(id) = record.id {
        revision.record("records", id, Action::Created, &record);
    }
    save_revision(&state, revision);
    Ok(HttpResponse::Created().json(record))
}

pub async fn update(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    id: web::Path<i64>,
    payload: web::Json<RecordRequest>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let conn = connect(&state)?;
    let existing = records::get(&conn, id)?.ok_or_else(|| AppError::not_found("Record", id))?;
    if existing.dataset != payload.dataset {
        return Err(AppError::BadRequest("dataset: a record cannot move to another dataset".into()));
    }
    let record = build_record(&state, &conn, &user, &payload)?;
    let record = records::update(&conn, id, &record)?.ok_or_else(|| AppError::not_found("Record", id))?;

    let mut revision = Revision::new(Some(user.id), "record updated");
    revision.record("records", id, Action::Updated, &record);
    save_revision(&state, revision);
    Ok(HttpResponse::Ok().json(record))
}

pub async fn destroy(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    id: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let conn = connect(&state)?;
    let record = records::get(&conn, id)?.ok_or_else(|| AppError::not_found("Record", id))?;
    let project = records::project_id(&conn, id)?.ok_or_else(|| AppError::not_found("Record", id))?;
    ensure_custodian(&conn, &user, project)?;
    records::delete(&conn, id)?;

    let mut revision = Revision::new(Some(user.id), "record deleted");
    revision.record("records", id, Action::Deleted, &record);
    save_revision(&state, revision);
    Ok(no_content())
}
