//! Error type shared by the HTTP handlers and the import pipeline, and its
//! mapping onto HTTP responses.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::import::ImportError;
use crate::schema::SchemaError;
use crate::species::SpeciesError;

pub type ApiResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication credentials were not provided.")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    /// A record payload that does not satisfy its dataset schema.
    #[error("Record validation failed")]
    Validation(BTreeMap<String, String>),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Species(#[from] SpeciesError),
    #[error("database error: {0}")]
    Database(rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: &str, id: i64) -> Self {
        AppError::NotFound(format!("{what} {id}"))
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                AppError::Conflict(msg.clone().unwrap_or_else(|| e.to_string()))
            }
            _ => AppError::Database(err),
        }
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::BadRequest(format!("invalid multipart body: {err}"))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("task join error: {err}"))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_)
            | AppError::Validation(_)
            | AppError::Import(_)
            | AppError::Schema(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Species(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Io(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            AppError::Validation(errors) => json!({ "detail": self.to_string(), "errors": errors }),
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                // Details stay in the log.
                error!("{self}");
                json!({ "detail": "Internal server error" })
            }
            _ => json!({ "detail": self.to_string() }),
        };
        HttpResponse::build(status).json(body)
    }
}
