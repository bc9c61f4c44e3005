//! # Dataset Service Module
//!
//! Endpoints under `/api/datasets`.
//!
//! ## Sub-modules:
//! - `crud`: datasets, whose data package is checked against the dataset
//!   type on every write.
//! - `upload_records`: validates an uploaded CSV or XLSX file row by row and
//!   creates the records, or only reports with `?dry_run=true`.

mod crud;
mod upload_records;

use actix_web::web::{delete, get, post, put, resource, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/datasets";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .service(resource("").route(get().to(crud::list)).route(post().to(crud::create)))
        .service(
            resource("/{id}")
                .route(get().to(crud::detail))
                .route(put().to(crud::update))
                .route(delete().to(crud::destroy)),
        )
        .service(resource("/{id}/upload-records").route(post().to(upload_records::process)))
}

#[cfg(test)]
mod tests {
    use crate::db::{records, sites};
    use crate::services::testing::{authorized, multipart, test_app};
    use crate::test_support::{create_dataset, create_dataset_with_package, data_package, owned_project, test_db};
    use actix_web::http::StatusCode;
    use actix_web::test::{call_service, init_service, read_body_json, TestRequest};
    use biosys_common::model::dataset::DatasetType;
    use rstest::rstest;
    use serde_json::{json, Value};

    fn species_fields() -> Value {
        json!([
            {"name": "Observation Date", "type": "date", "format": "any"},
            {"name": "Latitude", "type": "number"},
            {"name": "Longitude", "type": "number"},
            {"name": "Species Name", "type": "string", "constraints": {"required": true}},
        ])
    }

    #[rstest]
    #[case("generic", json!([{"name": "What"}]), StatusCode::CREATED)]
    #[case("observation", json!([{"name": "What"}]), StatusCode::BAD_REQUEST)]
    #[case("species_observation", species_fields(), StatusCode::CREATED)]
    #[case("observation", json!([{"name": "When", "type": "geopoint"}]), StatusCode::BAD_REQUEST)]
    #[actix_web::test]
    async fn schema_is_checked_against_the_type(
        #[case] dataset_type: &str,
        #[case] fields: Value,
        #[case] expected: StatusCode,
    ) {
        let (_dir, db) = test_db();
        let (project, token) = owned_project(&db.connect().unwrap(), "Survey");
        let app = init_service(test_app(db)).await;
        let req = authorized(TestRequest::post().uri("/api/datasets"), &token)
            .set_json(json!({
                "project": project.id,
                "name": "Data",
                "type": dataset_type,
                "data_package": data_package(fields),
            }))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), expected);
    }

    async fn upload(
        app: &impl actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
        uri: &str,
        token: &str,
        csv: &str,
    ) -> (StatusCode, Value) {
        let (content_type, body) = multipart("records.csv", "text/csv", csv.as_bytes());
        let req = authorized(TestRequest::post().uri(uri), token)
            .insert_header(("Content-Type", content_type))
            .set_payload(body)
            .to_request();
        let resp = call_service(app, req).await;
        let status = resp.status();
        (status, read_body_json(resp).await)
    }

    const CSV: &str = "Observation Date,Latitude,Longitude,Species Name,Notes\n\
                       21/03/2018,-32,116,Canis lupus,seen\n\
                       22/03/2018,-32,116,,heard\n\
                       23/03/2018,-31,115,Felis catus,\n";

    #[actix_web::test]
    async fn upload_creates_valid_records() {
        let (_dir, db) = test_db();
        let conn = db.connect().unwrap();
        let (project, token) = owned_project(&conn, "Survey");
        let dataset = create_dataset(&conn, project.id, DatasetType::SpeciesObservation, species_fields());
        let app = init_service(test_app(db)).await;

        let uri = format!("/api/datasets/{}/upload-records", dataset.id);
        let (status, report) = upload(&app, &uri, &token, CSV).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["total"], 3);
        assert_eq!(report["created"], 2);
        assert_eq!(report["errors"], 1);
        assert_eq!(report["dry_run"], false);
        assert_eq!(report["checksum"].as_str().unwrap().len(), 32);
        assert!(report["rows"][1]["errors"]["Species Name"].is_string());
        assert_eq!(report["rows"][0]["warnings"]["Notes"], "Unknown field");
        assert_eq!(report["rows"][2]["record"]["name_id"], -1);
        assert_eq!(report["rows"][0]["record"]["name_id"], 25_000);
        assert_eq!(records::list(&conn, Some(dataset.id)).unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn dry_run_keeps_nothing() {
        let (_dir, db) = test_db();
        let conn = db.connect().unwrap();
        let (project, token) = owned_project(&conn, "Survey");
        let package = json!({"resources": [{"name": "obs", "schema": {
            "fields": [{"name": "Date", "type": "date", "format": "any"}, {"name": "Site"}],
            "foreignKeys": [{"fields": "Site", "reference": {"resource": "Site", "fields": "code"}}]
        }}]});
        let dataset = create_dataset_with_package(&conn, project.id, DatasetType::Generic, package);
        let app = init_service(test_app(db)).await;

        let uri = format!("/api/datasets/{}/upload-records?dry_run=true&create_site=true", dataset.id);
        let (status, report) = upload(&app, &uri, &token, "Date,Site\n2018-03-21,NEW\n").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["dry_run"], true);
        assert_eq!(report["created"], 1);
        assert!(report["rows"][0]["record"]["id"].is_null());
        assert!(records::list(&conn, Some(dataset.id)).unwrap().is_empty());
        assert!(sites::list(&conn, Some(project.id)).unwrap().is_empty());
    }

    #[actix_web::test]
    async fn only_custodians_upload() {
        let (_dir, db) = test_db();
        let conn = db.connect().unwrap();
        let (project, _) = owned_project(&conn, "Survey");
        let (_, stranger) = crate::test_support::user(&conn, "stranger");
        let dataset = create_dataset(&conn, project.id, DatasetType::SpeciesObservation, species_fields());
        let app = init_service(test_app(db)).await;
        let uri = format!("/api/datasets/{}/upload-records", dataset.id);
        let (status, _) = upload(&app, &uri, &stranger, CSV).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
