//! Read-only export of dataset records under `/publish`.

mod data;

use actix_web::web::{get, resource, scope};
use actix_web::Scope;

const PUBLISH_PATH: &str = "/publish";

pub fn configure_routes() -> Scope {
    scope(PUBLISH_PATH).service(resource("/data/{dataset_id}").route(get().to(data::process)))
}

#[cfg(test)]
mod tests {
    use crate::db::records;
    use crate::services::testing::{authorized, test_app};
    use crate::test_support::{create_dataset, owned_project, test_db};
    use actix_web::http::StatusCode;
    use actix_web::test::{call_service, init_service, read_body_json, TestRequest};
    use biosys_common::model::dataset::DatasetType;
    use biosys_common::model::record::Record;
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn publishes_record_data_with_ids() {
        let (_dir, db) = test_db();
        let conn = db.connect().unwrap();
        let (project, token) = owned_project(&conn, "Survey");
        let dataset = create_dataset(&conn, project.id, DatasetType::Generic, json!([{"name": "What"}]));
        let mut data = serde_json::Map::new();
        data.insert("What".into(), json!("Bird"));
        let record = records::insert(
            &conn,
            &Record {
                id: None,
                dataset: dataset.id,
                site: None,
                data,
                datetime: None,
                geometry: None,
                species_name: None,
                name_id: None,
                client_id: None,
                source_info: None,
            },
        )
        .unwrap();
        let app = init_service(test_app(db)).await;

        let req = authorized(TestRequest::get().uri(&format!("/publish/data/{}", dataset.id)), &token)
            .to_request();
        let body: Value = read_body_json(call_service(&app, req).await).await;
        assert_eq!(body, json!({"data": [{"What": "Bird", "_id": record.id}]}));

        let req = authorized(TestRequest::get().uri("/publish/data/999"), &token).to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
