use crate::audit::{Action, Revision};
use crate::auth::{ensure_custodian, Authenticated};
use crate::db::projects;
use crate::error::{ApiResult, AppError};
use crate::import::file_reader::FileReader;
use crate::import::site_uploader::SiteUploader;
use crate::services::save_revision;
use crate::services::upload::{read_file, Upload};
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use biosys_common::model::user::User;
use biosys_common::uploads::{SiteUploadReport, SiteUploadRow};
use log::{info, warn};

pub async fn process(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    id: web::Path<i64>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let upload = read_file(payload, state.max_upload_bytes).await?;
    let report = tokio::task::spawn_blocking(move || upload_sites(&state, &user, id, upload)).await??;
    Ok(HttpResponse::Ok().json(report))
}

fn upload_sites(state: &AppState, user: &User, project_id: i64, upload: Upload) -> ApiResult<SiteUploadReport> {
    let mut conn = state.db.connect()?;
    let project = projects::get(&conn, project_id)?.ok_or_else(|| AppError::not_found("Project", project_id))?;
    ensure_custodian(&conn, user, project_id)?;

    let file_name = upload.file.file_name.clone();
    let reader = FileReader::new(upload.file)?;
    let mut revision = Revision::new(Some(user.id), format!("sites uploaded from {file_name}"));
    let tx = conn.transaction()?;
    let mut rows = Vec::new();
    for outcome in SiteUploader::new(&tx, &project, reader) {
        let outcome = outcome?;
        if let Some(site) = &outcome.site {
            let action = if outcome.created { Action::Created } else { Action::Updated };
            revision.record("sites", site.id, action, site);
        }
        if let Some(error) = &outcome.error {
            warn!("{file_name} row {}: {error}", outcome.row);
        }
        rows.push(SiteUploadRow {
            row: outcome.row,
            site: outcome.site.map(|s| s.id),
            error: outcome.error,
        });
    }
    tx.commit()?;
    save_revision(state, revision);

    let created = rows.iter().filter(|r| r.site.is_some()).count();
    let errors = rows.len() - created;
    info!("{file_name}: {created} sites saved, {errors} rows rejected in project {project_id}");
    Ok(SiteUploadReport {
        file_name,
        created,
        errors,
        rows,
    })
}
