use crate::auth::{ensure_custodian, Authenticated};
use crate::db::{media, records};
use crate::error::{ApiResult, AppError};
use crate::services::{connect, no_content, RecordFilter};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use biosys_common::requests::MediaRequest;
use log::{info, warn};
use md5::Context;
use std::fs;
use std::path::Path;

/// Accepts both a bare base64 string and a `data:<type>;base64,` URL.
fn decode(payload: &str) -> ApiResult<Vec<u8>> {
    let encoded = match payload.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => payload,
    };
    BASE64
        .decode(encoded.trim())
        .map_err(|e| AppError::BadRequest(format!("base64: {e}")))
}

fn safe_file_name(file_name: &str) -> ApiResult<&str> {
    Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("file_name: invalid file name".into()))
}

pub async fn list(
    state: web::Data<AppState>,
    _: Authenticated,
    filter: web::Query<RecordFilter>,
) -> ApiResult<HttpResponse> {
    let conn = connect(&state)?;
    Ok(HttpResponse::Ok().json(media::list(&conn, filter.record)?))
}

pub async fn detail(
    state: web::Data<AppState>,
    _: Authenticated,
    id: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let conn = connect(&state)?;
    let media = media::get(&conn, id)?.ok_or_else(|| AppError::not_found("Media", id))?;
    Ok(HttpResponse::Ok().json(media))
}

pub async fn create(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    payload: web::Json<MediaRequest>,
) -> ApiResult<HttpResponse> {
    let conn = connect(&state)?;
    let record = records::get(&conn, payload.record)?
        .ok_or_else(|| AppError::not_found("Record", payload.record))?;
    let project = records::project_id(&conn, payload.record)?
        .ok_or_else(|| AppError::not_found("Record", payload.record))?;
    ensure_custodian(&conn, &user, project)?;

    let file_name = safe_file_name(&payload.file_name)?;
    let bytes = decode(&payload.base64)?;
    let mut md5_hasher = Context::new();
    md5_hasher.consume(&bytes);
    let digest = format!("{:x}", md5_hasher.finalize());

    let relative = format!(
        "project_{project}/dataset_{}/record_{}/{digest}_{file_name}",
        record.dataset, payload.record
    );
    let path = state.media_root.join(&relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, &bytes)?;
    let media = media::insert(&conn, payload.record, &relative)?;
    info!("media {} stored at {relative} ({} bytes)", media.id, bytes.len());
    Ok(HttpResponse::Created().json(media))
}

pub async fn destroy(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    id: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let conn = connect(&state)?;
    let media = media::get(&conn, id)?.ok_or_else(|| AppError::not_found("Media", id))?;
    let project = records::project_id(&conn, media.record)?
        .ok_or_else(|| AppError::not_found("Record", media.record))?;
    ensure_custodian(&conn, &user, project)?;
    media::delete(&conn, id)?;
    if let Err(e) = fs::remove_file(state.media_root.join(&media.file)) {
        warn!("media {id}: could not remove {}: {e}", media.file);
    }
    Ok(no_content())
}
