//! Token authentication and project permissions.
//!
//! Clients send `Authorization: Token <key>` (`Bearer` is accepted too).
//! A well-formed header with an unknown key is rejected with 401 even on
//! endpoints that allow anonymous access.

use crate::db::{projects, users};
use crate::error::AppError;
use crate::state::AppState;
use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use biosys_common::model::user::User;
use rusqlite::Connection;
use std::future::{ready, Ready};

/// The requesting user, if any.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

/// The requesting user; extraction fails with 401 for anonymous requests.
#[derive(Debug, Clone)]
pub struct Authenticated(pub User);

fn token(req: &HttpRequest) -> Option<&str> {
    let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, key) = header.trim().split_once(' ')?;
    let key = key.trim();
    let known = scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer");
    (known && !key.is_empty()).then_some(key)
}

fn current_user(req: &HttpRequest) -> Result<Option<User>, AppError> {
    let Some(token) = token(req) else {
        return Ok(None);
    };
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state is not configured".into()))?;
    let conn = state.db.connect()?;
    match users::find_by_token(&conn, token)? {
        Some(user) => Ok(Some(user)),
        None => Err(AppError::Unauthorized),
    }
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(current_user(req).map(CurrentUser))
    }
}

impl FromRequest for Authenticated {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(current_user(req).and_then(|user| user.map(Authenticated).ok_or(AppError::Unauthorized)))
    }
}

/// Superusers and the project's custodians may change its data.
pub fn ensure_custodian(conn: &Connection, user: &User, project_id: i64) -> Result<(), AppError> {
    if user.is_superuser || projects::is_custodian(conn, project_id, user.id)? {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "You are not a custodian of project {project_id}"
    )))
}
