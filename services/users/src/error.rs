//! Error types for the users service
//!
//! `UserError` is what every gateway operation returns; `ApiError` is the
//! transport-level rendering of it.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use serde_json::json;
use thiserror::Error;

use crate::models::user::UserField;

/// Outcome of a failed user operation
#[derive(Error, Debug)]
pub enum UserError {
    /// A unique field already holds this value
    #[error("Duplicate key error '{value}'")]
    DuplicateKey { field: UserField, value: String },

    /// The record does not exist, the id is malformed, or a search matched nothing
    #[error("{0}")]
    NotFound(String),

    /// A search request carried no criteria
    #[error("{0}")]
    InvalidQuery(String),

    /// Import rows could not be read
    #[error("Invalid import: {0}")]
    InvalidImport(String),

    /// Database error
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl UserError {
    pub fn duplicate(field: UserField, value: impl Into<String>) -> Self {
        UserError::DuplicateKey {
            field,
            value: value.into(),
        }
    }
}

/// Type alias for user operation results
pub type UserResult<T> = Result<T, UserError>;

/// Custom error type for the HTTP boundary
#[derive(Error, Debug)]
pub enum ApiError {
    /// Conflicting unique value
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::DuplicateKey { .. } => ApiError::Conflict(err.to_string()),
            UserError::NotFound(msg) => ApiError::NotFound(msg),
            UserError::InvalidQuery(msg) => ApiError::BadRequest(msg),
            UserError::InvalidImport(_) => ApiError::BadRequest(err.to_string()),
            UserError::Database(e) => {
                tracing::error!("Database failure: {}", e);
                ApiError::InternalServerError
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_map_to_status_codes() {
        let cases = [
            (
                UserError::duplicate(UserField::Username, "annlee"),
                StatusCode::CONFLICT,
            ),
            (
                UserError::NotFound("User id 'x' not found.".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                UserError::InvalidQuery("no criteria".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                UserError::InvalidImport("bad row".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                UserError::Database(DatabaseError::Migration("boom".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn test_duplicate_key_message_names_value() {
        let err = UserError::duplicate(UserField::Email, "ann@example.com");
        assert_eq!(err.to_string(), "Duplicate key error 'ann@example.com'");
        assert!(matches!(
            ApiError::from(err),
            ApiError::Conflict(msg) if msg.contains("ann@example.com")
        ));
    }
}
