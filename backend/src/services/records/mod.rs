//! Endpoints under `/api/records`. A posted record goes through the same
//! schema validation as an uploaded row.

mod crud;

use actix_web::web::{delete, get, post, put, resource, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/records";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .service(resource("").route(get().to(crud::list)).route(post().to(crud::create)))
        .service(
            resource("/{id}")
                .route(get().to(crud::detail))
                .route(put().to(crud::update))
                .route(delete().to(crud::destroy)),
        )
}

#[cfg(test)]
mod tests {
    use crate::services::testing::{authorized, test_app};
    use crate::test_support::{create_dataset, owned_project, test_db};
    use actix_web::http::StatusCode;
    use actix_web::test::{call_service, init_service, read_body_json, TestRequest};
    use biosys_common::model::dataset::DatasetType;
    use serde_json::{json, Value};

    fn fields() -> Value {
        json!([
            {"name": "When", "type": "date", "format": "any", "biosys": {"type": "observationDate"}},
            {"name": "Latitude", "type": "number"},
            {"name": "Longitude", "type": "number"},
            {"name": "Count", "type": "integer", "constraints": {"required": true}},
        ])
    }

    #[actix_web::test]
    async fn posted_records_are_validated() {
        let (_dir, db) = test_db();
        let conn = db.connect().unwrap();
        let (project, token) = owned_project(&conn, "Survey");
        let dataset = create_dataset(&conn, project.id, DatasetType::Observation, fields());
        let app = init_service(test_app(db)).await;

        let req = authorized(TestRequest::post().uri("/api/records"), &token)
            .set_json(json!({
                "dataset": dataset.id,
                "data": {"When": "2018-03-21", "Latitude": -32, "Longitude": 116}
            }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = read_body_json(resp).await;
        assert_eq!(body["errors"]["Count"], "This field is required");

        let req = authorized(TestRequest::post().uri("/api/records"), &token)
            .set_json(json!({
                "dataset": dataset.id,
                "client_id": "tablet-1",
                "data": {"When": "2018-03-21", "Latitude": -32, "Longitude": 116, "Count": 4}
            }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let record: Value = read_body_json(resp).await;
        assert_eq!(record["data"]["Count"], 4);
        assert_eq!(record["client_id"], "tablet-1");
        assert_eq!(record["datetime"], "2018-03-21T00:00:00+08:00");
        assert_eq!(record["geometry"]["coordinates"], json!([116.0, -32.0]));

        let uri = format!("/api/records/{}", record["id"]);
        let req = authorized(TestRequest::put().uri(&uri), &token)
            .set_json(json!({
                "dataset": dataset.id,
                "data": {"When": "2018-03-22", "Latitude": -33, "Longitude": 116, "Count": 5}
            }))
            .to_request();
        let updated: Value = read_body_json(call_service(&app, req).await).await;
        assert_eq!(updated["id"], record["id"]);
        assert_eq!(updated["data"]["Count"], 5);

        let req = authorized(TestRequest::get().uri(&format!("/api/records?dataset={}", dataset.id)), &token)
            .to_request();
        let listed: Value = read_body_json(call_service(&app, req).await).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let req = authorized(TestRequest::delete().uri(&uri), &token).to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn unknown_dataset_is_not_found() {
        let (_dir, db) = test_db();
        let (_, token) = owned_project(&db.connect().unwrap(), "Survey");
        let app = init_service(test_app(db)).await;
        let req = authorized(TestRequest::post().uri("/api/records"), &token)
            .set_json(json!({"dataset": 99, "data": {}}))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
