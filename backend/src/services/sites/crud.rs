use crate::audit::{Action, Revision};
use crate::auth::{ensure_custodian, Authenticated};
use crate::db::{projects, sites};
use crate::error::{ApiResult, AppError};
use crate::services::{connect, no_content, save_revision, ProjectFilter};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use biosys_common::requests::SiteRequest;
use rusqlite::Connection;

fn check_request(conn: &Connection, req: &SiteRequest) -> ApiResult<()> {
    if req.code.trim().is_empty() {
        return Err(AppError::BadRequest("code: This field may not be blank.".into()));
    }
    projects::get(conn, req.project)?.ok_or_else(|| AppError::not_found("Project", req.project))?;
    if let Some(parent) = req.parent_site {
        sites::get(conn, parent)?.ok_or_else(|| AppError::not_found("Site", parent))?;
    }
    Ok(())
}

pub async fn list(
    state: web::Data<AppState>,
    _: Authenticated,
    filter: web::Query<ProjectFilter>,
) -> ApiResult<HttpResponse> {
    let conn = connect(&state)?;
    Ok(HttpResponse::Ok().json(sites::list(&conn, filter.project)?))
}

pub async fn detail(
    state: web::Data<AppState>,
    _: Authenticated,
    id: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let conn = connect(&state)?;
    let site = sites::get(&conn, id)?.ok_or_else(|| AppError::not_found("Site", id))?;
    Ok(HttpResponse::Ok().json(site))
}

pub async fn create(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    payload: web::Json<SiteRequest>,
) -> ApiResult<HttpResponse> {
    let conn = connect(&state)?;
    check_request(&conn, &payload)?;
    ensure_custodian(&conn, &user, payload.project)?;
    let site = sites::insert(&conn, &payload)?;

    let mut revision = Revision::new(Some(user.id), "site created");
    revision.record("sites", site.id, Action::Created, &site);
    save_revision(&state, revision);
    Ok(HttpResponse::Created().json(site))
}

pub async fn update(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    id: web::Path<i64>,
    payload: web::Json<SiteRequest>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let conn = connect(&state)?;
    let existing = sites::get(&conn, id)?.ok_or_else(|| AppError::not_found("Site", id))?;
    check_request(&conn, &payload)?;
    ensure_custodian(&conn, &user, existing.project)?;
    if payload.project != existing.project {
        ensure_custodian(&conn, &user, payload.project)?;
    }
    let site = sites::update(&conn, id, &payload)?.ok_or_else(|| AppError::not_found("Site", id))?;

    let mut revision = Revision::new(Some(user.id), "site updated");
    revision.record("sites", id, Action::Updated, &site);
    save_revision(&state, revision);
    Ok(HttpResponse::Ok().json(site))
}

pub async fn destroy(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    id: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let conn = connect(&state)?;
    let site = sites::get(&conn, id)?.ok_or_else(|| AppError::not_found("Site", id))?;
    ensure_custodian(&conn, &user, site.project)?;
    sites::delete(&conn, id)?;

    let mut revision = Revision::new(Some(user.id), "site deleted");
    revision.record("sites", id, Action::Deleted, &site);
    save_revision(&state, revision);
    Ok(no_content())
}
