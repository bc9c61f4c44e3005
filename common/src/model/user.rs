use serde::{Deserialize, Serialize};

/// An API user as exposed by `whoami`. The authentication token is never
/// part of the serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_superuser: bool,
}
