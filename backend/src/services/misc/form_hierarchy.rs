use crate::auth::Authenticated;
use crate::db::{datasets, forms, sites};
use crate::error::ApiResult;
use crate::services::connect;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::{json, Map, Value};

/// Everything a data-entry client needs offline: the sites of every project
/// as `{site_id: "name (code)"}` entries under `sites`, and per project id
/// the latest form with the table schema of its dataset.
pub async fn process(state: web::Data<AppState>, _: Authenticated) -> ApiResult<HttpResponse> {
    let conn = connect(&state)?;

    let mut by_project: Map<String, Value> = Map::new();
    for site in sites::list(&conn, None)? {
        let entry = by_project
            .entry(site.project.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(entries) = entry {
            entries.push(json!({ site.id.to_string(): site.label() }));
        }
    }

    let mut body = Map::new();
    body.insert("sites".to_string(), Value::Object(by_project));
    for form in forms::list(&conn, None)? {
        let Some(dataset) = datasets::get(&conn, form.dataset)? else {
            continue;
        };
        let table_schema = dataset
            .data_package
            .pointer("/resources/0/schema")
            .cloned()
            .unwrap_or(Value::Null);
        body.insert(
            dataset.project.to_string(),
            json!({
                "name": form.name,
                "layout": form.layout,
                "table_schema": table_schema,
                "dataset": dataset.id,
            }),
        );
    }
    Ok(HttpResponse::Ok().json(Value::Object(body)))
}
