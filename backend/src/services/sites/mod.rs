//! Endpoints under `/api/sites`.

mod crud;

use actix_web::web::{delete, get, post, put, resource, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/sites";

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
    use crate::test_support::{owned_project, project, test_db, user};
    use actix_web::http::StatusCode;
    use actix_web::test::{call_service, init_service, read_body_json, TestRequest};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn custodian_manages_sites() {
        let (_dir, db) = test_db();
        let conn = db.connect().unwrap();
        let (project, token) = owned_project(&conn, "Survey");
        let app = init_service(test_app(db)).await;

        let req = authorized(TestRequest::post().uri("/api/sites"), &token)
            .set_json(json!({
                "project": project.id,
                "code": "S1",
                "name": "First",
                "geometry": {"type": "Point", "coordinates": [116.0, -32.0], "srid": 4326}
            }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let site: Value = read_body_json(resp).await;
        assert_eq!(site["geometry"]["coordinates"], json!([116.0, -32.0]));

        let req = authorized(TestRequest::post().uri("/api/sites"), &token)
            .set_json(json!({"project": project.id, "code": "S1"}))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = authorized(
            TestRequest::get().uri(&format!("/api/sites?project={}", project.id)),
            &token,
        )
        .to_request();
        let listed: Value = read_body_json(call_service(&app, req).await).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let req = authorized(TestRequest::delete().uri(&format!("/api/sites/{}", site["id"])), &token)
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn strangers_cannot_add_sites() {
        let (_dir, db) = test_db();
        let conn = db.connect().unwrap();
        let project = project(&conn, "Survey");
        let (_, token) = user(&conn, "stranger");
        let app = init_service(test_app(db)).await;
        let req = authorized(TestRequest::post().uri("/api/sites"), &token)
            .set_json(json!({"project": project.id, "code": "S1"}))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }
}
