use crate::auth::CurrentUser;
use actix_web::HttpResponse;
use serde_json::json;

/// The authenticated user, or `{}` for anonymous callers.
pub async fn process(CurrentUser(user): CurrentUser) -> HttpResponse {
    match user {
        Some(user) => HttpResponse::Ok().json(user),
        None => HttpResponse::Ok().json(json!({})),
    }
}
