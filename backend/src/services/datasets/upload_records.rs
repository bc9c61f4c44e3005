use crate::audit::{Action, Revision};
use crate::auth::{ensure_custodian, Authenticated};
use crate::db::{datasets, projects};
use crate::error::{ApiResult, AppError};
use crate::import::file_reader::FileReader;
use crate::import::record_creator::RecordCreator;
use crate::services::save_revision;
use crate::services::upload::{read_file, Upload};
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use biosys_common::model::user::User;
use biosys_common::uploads::{RecordUploadReport, RecordUploadRow};
use log::info;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct UploadOptions {
    /// Validate and report without keeping anything.
    #[serde(default)]
    pub dry_run: bool,
    /// Create the sites referenced by rows but missing from the project.
    #[serde(default)]
    pub create_site: bool,
}

pub async fn process(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    id: web::Path<i64>,
    options: web::Query<UploadOptions>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let id = id.into_inner();
    let options = options.into_inner();
    let upload = read_file(payload, state.max_upload_bytes).await?;
    let report =
        tokio::task::spawn_blocking(move || upload_records(&state, &user, id, &options, upload)).await??;
    Ok(HttpResponse::Ok().json(report))
}

fn upload_records(
    state: &AppState,
    user: &User,
    dataset_id: i64,
    options: &UploadOptions,
    upload: Upload,
) -> ApiResult<RecordUploadReport> {
    let mut conn = state.db.connect()?;
    let dataset = datasets::get(&conn, dataset_id)?.ok_or_else(|| AppError::not_found("Dataset", dataset_id))?;
    let project = projects::get(&conn, dataset.project)?
        .ok_or_else(|| AppError::not_found("Project", dataset.project))?;
    ensure_custodian(&conn, user, project.id)?;

    let Upload { file, checksum } = upload;
    let file_name = file.file_name.clone();
    let reader = FileReader::new(file)?;
    let mut revision = Revision::new(Some(user.id), format!("records uploaded from {file_name}"));
    let tx = conn.transaction()?;
    let mut creator = RecordCreator::new(&tx, &dataset, &project, reader, state.species.as_ref(), state.time_zone)?
        .commit(!options.dry_run)
        .create_site(options.create_site)
        .source_file(file_name.clone());

    let mut rows = Vec::new();
    for outcome in creator.by_ref() {
        let outcome = outcome?;
        if let Some(record) = &outcome.record {
            if let Some(id) = record.id {
                revision.record("records", id, Action::Created, record);
            }
        }
        rows.push(RecordUploadRow {
            row: outcome.row,
            record: outcome.record,
            errors: outcome.result.errors,
            warnings: outcome.result.warnings,
        });
    }
    for site in creator.created_sites() {
        revision.record("sites", site.id, Action::Created, site);
    }
    drop(creator);

    let total = rows.len();
    let created = rows.iter().filter(|r| r.record.is_some()).count();
    if options.dry_run {
        tx.rollback()?;
        info!("{file_name}: dry run over {total} rows of dataset {dataset_id}, {created} valid");
    } else {
        tx.commit()?;
        save_revision(state, revision);
        info!("{file_name}: {created} of {total} records created in dataset {dataset_id}");
    }
    Ok(RecordUploadReport {
        file_name,
        checksum,
        dry_run: options.dry_run,
        total,
        created,
        errors: total - created,
        rows,
    })
}
