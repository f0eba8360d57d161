use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Field-keyed validation messages, every violated rule listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    // Client-fixable input problems
    #[error("Validation failed")]
    Validation(FieldErrors),

    // Auth errors
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Bearer token is missing")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("User not authenticated")]
    Unauthenticated,

    // Resource errors
    #[error("{0} not found")]
    NotFound(&'static str),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "success": false,
                    "message": "Validation failed",
                    "errors": errors,
                }),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "success": false,
                    "message": "Invalid credentials",
                    "errors": {
                        "email": ["The provided credentials are incorrect."],
                    },
                }),
            ),
            AppError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "success": false,
                    "message": "Authentication required",
                    "error": "Bearer token is missing",
                }),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "success": false,
                    "message": "Authentication failed",
                    "error": "Invalid or expired token",
                }),
            ),
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "success": false,
                    "message": "User not authenticated",
                    "error": "No valid user found",
                }),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                json!({
                    "success": false,
                    "message": format!("{resource} not found"),
                    "error": "Resource not found",
                }),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "success": false,
                        "message": "Request failed",
                        "error": "Internal server error",
                    }),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "success": false,
                        "message": "Request failed",
                        "error": "Internal server error",
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_accumulate_per_field() {
        let mut errors = FieldErrors::default();
        errors.add("email", "Email is required.");
        errors.add("email", "Please enter a valid email address.");
        errors.add("first_name", "First name is required.");

        assert_eq!(errors.0["email"].len(), 2);
        assert!(errors.contains("first_name"));
        assert!(!errors.is_empty());
    }

    #[test]
    fn not_found_maps_to_404_envelope() {
        let response = AppError::NotFound("Contact").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_maps_to_422() {
        let response =
            AppError::Validation(FieldErrors::single("email", "Email is required.")).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
