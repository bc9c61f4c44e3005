use crate::audit::{Action, Revision};
use crate::auth::{ensure_custodian, Authenticated};
use crate::db::projects;
use crate::error::{ApiResult, AppError};
use crate::services::{connect, no_content, save_revision};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use biosys_common::requests::ProjectRequest;
use chrono_tz::Tz;
use log::info;

fn check_request(req: &ProjectRequest) -> ApiResult<()> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("name: This field may not be blank.".into()));
    }
    if let Some(tz) = req.timezone.as_deref() {
        tz.parse::<Tz>()
            .map_err(|_| AppError::BadRequest(format!("timezone: unknown time zone '{tz}'")))?;
    }
    Ok(())
}

pub async fn list(state: web::Data<AppState>, _: Authenticated) -> ApiResult<HttpResponse> {
    let conn = connect(&state)?;
    Ok(HttpResponse::Ok().json(projects::list(&conn)?))
}

pub async fn detail(
    state: web::Data<AppState>,
    _: Authenticated,
    id: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let conn = connect(&state)?;
    let project = projects::get(&conn, id)?.ok_or_else(|| AppError::not_found("Project", id))?;
    Ok(HttpResponse::Ok().json(project))
}

pub async fn create(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    payload: web::Json<ProjectRequest>,
) -> ApiResult<HttpResponse> {
    check_request(&payload)?;
    let conn = connect(&state)?;
    let project = projects::insert(&conn, &payload, user.id)?;
    info!("project {} '{}' created by {}", project.id, project.name, user.username);

    let mut revision = Revision::new(Some(user.id), "project created");
    revision.record("projects", project.id, Action::Created, &project);
    save_revision(&state, revision);
    Ok(HttpResponse::Created().json(project))
}

pub async fn update(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    id: web::Path<i64>,
    payload: web::Json<ProjectRequest>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    check_request(&payload)?;
    let conn = connect(&state)?;
    projects::get(&conn, id)?.ok_or_else(|| AppError::not_found("Project", id))?;
    ensure_custodian(&conn, &user, id)?;
    let project = projects::update(&conn, id, &payload)?.ok_or_else(|| AppError::not_found("Project", id))?;

    let mut revision = Revision::new(Some(user.id), "project updated");
    revision.record("projects", id, Action::Updated, &project);
    save_revision(&state, revision);
    Ok(HttpResponse::Ok().json(project))
}

pub async fn destroy(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    id: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let conn = connect(&state)?;
    let project = projects::get(&conn, id)?.ok_or_else(|| AppError::not_found("Project", id))?;
    ensure_custodian(&conn, &user, id)?;
    projects::delete(&conn, id)?;
    info!("project {id} deleted by {}", user.username);

    let mut revision = Revision::new(Some(user.id), "project deleted");
    revision.record("projects", id, Action::Deleted, &project);
    save_revision(&state, revision);
    Ok(no_content())
}
