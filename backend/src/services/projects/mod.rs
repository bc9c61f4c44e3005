//! # Project Service Module
//!
//! Endpoints under `/api/projects`.
//!
//! ## Sub-modules:
//! - `crud`: list, retrieve, create, update and delete projects.
//! - `upload_sites`: creates or updates the sites of a project from an
//!   uploaded CSV or XLSX file.

mod crud;
mod upload_sites;

use actix_web::web::{delete, get, post, put, resource, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/projects";

/// # Registered Routes:
///
/// *   **`GET /`**, **`POST /`**: every project; create one, the caller
///     becoming its custodian.
/// *   **`GET /{id}`**, **`PUT /{id}`**, **`DELETE /{id}`**: one project.
///     Changes are limited to custodians.
/// *   **`POST /{id}/upload-sites`**: multipart `file`; answers with a
///     per-row report.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .service(resource("").route(get().to(crud::list)).route(post().to(crud::create)))
        .service(
            resource("/{id}")
                .route(get().to(crud::detail))
                .route(put().to(crud::update))
                .route(delete().to(crud::destroy)),
        )
        .service(resource("/{id}/upload-sites").route(post().to(upload_sites::process)))
}

#[cfg(test)]
mod tests {
    use crate::db::{self, sites};
    use crate::services::testing::{authorized, multipart, test_app};
    use crate::test_support::{test_db, user};
    use actix_web::http::StatusCode;
    use actix_web::test::{call_service, init_service, read_body_json, TestRequest};
    use rstest::rstest;
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn create_then_read_back() {
        let (_dir, db) = test_db();
        let (alice, token) = user(&db.connect().unwrap(), "alice");
        let app = init_service(test_app(db)).await;

        let req = authorized(TestRequest::post().uri("/api/projects"), &token)
            .set_json(json!({"name": "Fauna", "timezone": "Australia/Sydney"}))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = read_body_json(resp).await;
        assert_eq!(created["custodians"], json!([alice.id]));
        assert_eq!(created["datum"], json!(4326));

        let req = authorized(
            TestRequest::get().uri(&format!("/api/projects/{}", created["id"])),
            &token,
        )
        .to_request();
        let read: Value = read_body_json(call_service(&app, req).await).await;
        assert_eq!(read, created);
    }

    #[rstest]
    #[case(json!({"name": ""}))]
    #[case(json!({"name": "X", "timezone": "Mars/Olympus"}))]
    #[case(json!({"code": "no name"}))]
    #[actix_web::test]
    async fn invalid_projects_are_rejected(#[case] body: Value) {
        let (_dir, db) = test_db();
        let (_, token) = user(&db.connect().unwrap(), "alice");
        let app = init_service(test_app(db)).await;
        let req = authorized(TestRequest::post().uri("/api/projects"), &token)
            .set_json(body)
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = read_body_json(resp).await;
        assert!(body["detail"].is_string());
    }

    #[actix_web::test]
    async fn anonymous_and_wrong_method() {
        let (_dir, db) = test_db();
        let app = init_service(test_app(db)).await;
        let resp = call_service(&app, TestRequest::get().uri("/api/projects").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let resp = call_service(&app, TestRequest::patch().uri("/api/projects").to_request()).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[actix_web::test]
    async fn only_custodians_change_a_project() {
        let (_dir, db) = test_db();
        let conn = db.connect().unwrap();
        let (owner, owner_token) = user(&conn, "owner");
        let (_, other_token) = user(&conn, "other");
        let project = db::projects::insert(&conn, &crate::test_support::project_request("Flora"), owner.id).unwrap();
        let app = init_service(test_app(db.clone())).await;
        let uri = format!("/api/projects/{}", project.id);

        let req = authorized(TestRequest::put().uri(&uri), &other_token)
            .set_json(json!({"name": "Hijacked"}))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = authorized(TestRequest::put().uri(&uri), &owner_token)
            .set_json(json!({"name": "Flora 2"}))
            .to_request();
        let updated: Value = read_body_json(call_service(&app, req).await).await;
        assert_eq!(updated["name"], "Flora 2");

        let req = authorized(TestRequest::delete().uri(&uri), &owner_token).to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
        let req = authorized(TestRequest::get().uri(&uri), &owner_token).to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let actions = db::revisions::actions_for(&conn, "projects", project.id).unwrap();
        assert_eq!(actions, vec!["updated", "deleted"]);
    }

    #[actix_web::test]
    async fn upload_sites_reports_each_row() {
        let (_dir, db) = test_db();
        let conn = db.connect().unwrap();
        let (owner, token) = user(&conn, "owner");
        let project = db::projects::insert(&conn, &crate::test_support::project_request("Flora"), owner.id).unwrap();
        let app = init_service(test_app(db.clone())).await;

        let csv = "Site Code,Site Name,Latitude,Longitude,Vegetation\nS1,One,-32,116,Heath\n,Blank,,,\nS2,Two,,,Scrub\n";
        let (content_type, body) = multipart("sites.csv", "text/csv", csv.as_bytes());
        let req = authorized(
            TestRequest::post().uri(&format!("/api/projects/{}/upload-sites", project.id)),
            &token,
        )
        .insert_header(("Content-Type", content_type))
        .set_payload(body)
        .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let report: Value = read_body_json(resp).await;
        assert_eq!(report["created"], 2);
        assert_eq!(report["errors"], 1);
        assert_eq!(report["rows"][1]["error"], "Site Code is missing");

        let saved = sites::list(&conn, Some(project.id)).unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].attributes["Vegetation"], "Heath");
        assert!(!saved[0].attributes.contains_key("Site Name"));
    }

    #[actix_web::test]
    async fn upload_sites_rejects_other_file_types() {
        let (_dir, db) = test_db();
        let conn = db.connect().unwrap();
        let (owner, token) = user(&conn, "owner");
        let project = db::projects::insert(&conn, &crate::test_support::project_request("Flora"), owner.id).unwrap();
        let app = init_service(test_app(db)).await;

        let (content_type, body) = multipart("sites.txt", "text/plain", b"Code\nS1\n");
        let req = authorized(
            TestRequest::post().uri(&format!("/api/projects/{}/upload-sites", project.id)),
            &token,
        )
        .insert_header(("Content-Type", content_type))
        .set_payload(body)
        .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = read_body_json(resp).await;
        assert!(body["detail"].as_str().unwrap().starts_with("Wrong file type text/plain"));
    }
}
