use crate::auth::Authenticated;
use crate::db::media;
use crate::error::{ApiResult, AppError};
use crate::services::connect;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use mime_guess::from_path;
use std::io::ErrorKind;

pub async fn process(
    state: web::Data<AppState>,
    _: Authenticated,
    id: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let conn = connect(&state)?;
    let media = media::get(&conn, id)?.ok_or_else(|| AppError::not_found("Media", id))?;
    let bytes = match std::fs::read(state.media_root.join(&media.file)) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("file of media {id}")));
        }
        Err(e) => return Err(e.into()),
    };
    let mime = from_path(&media.file).first_or_octet_stream();
    Ok(HttpResponse::Ok().content_type(mime.essence_str()).body(bytes))
}
