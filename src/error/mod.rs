//! Centralized API error handling
//!
//! This module provides a unified error type for API responses with proper
//! HTTP status code mapping and JSON error responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Nonce is expired")]
    NonceExpired,

    #[error("Signature is invalid")]
    InvalidSignature,

    #[error("Method already taken")]
    MethodAlreadyTaken,

    #[error("Failed to generate message")]
    MessageGenerationFailed,

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NonceExpired => "NONCE_IS_EXPIRED",
            ApiError::InvalidSignature => "SIGNATURE_IS_INVALID",
            ApiError::MethodAlreadyTaken => "METHOD_ALREADY_TAKEN",
            ApiError::MessageGenerationFailed => "FAIL_GENERATE_MESSAGE",
            ApiError::TooManyRequests => "TOO_MANY_REQUESTS",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NonceExpired => StatusCode::UNAUTHORIZED,
            ApiError::InvalidSignature => StatusCode::UNAUTHORIZED,
            ApiError::MethodAlreadyTaken => StatusCode::CONFLICT,
            ApiError::MessageGenerationFailed => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        // Log server errors
        if status.is_server_error() {
            tracing::error!(error = %message, code = %error_code, "Server error occurred");
        } else {
            tracing::debug!(error = %message, code = %error_code, "Client error occurred");
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => ApiError::ValidationError(msg),
            AuthError::NonceExpired => ApiError::NonceExpired,
            AuthError::InvalidSignature => ApiError::InvalidSignature,
            AuthError::MethodAlreadyTaken => ApiError::MethodAlreadyTaken,
            AuthError::MessageGenerationFailed => ApiError::MessageGenerationFailed,
            AuthError::UserNotFound => ApiError::NotFound("User not found".to_string()),
            AuthError::InvalidRefreshToken => {
                ApiError::Unauthorized("Invalid refresh token".to_string())
            }
            AuthError::ServiceUnavailable(msg) => ApiError::ServiceUnavailable(msg),
            AuthError::Token(msg) => ApiError::InternalError(msg),
            AuthError::Store(msg) => ApiError::DatabaseError(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::ValidationError(rejection.body_text())
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_codes() {
        let cases = [
            (AuthError::NonceExpired, "NONCE_IS_EXPIRED", StatusCode::UNAUTHORIZED),
            (AuthError::InvalidSignature, "SIGNATURE_IS_INVALID", StatusCode::UNAUTHORIZED),
            (AuthError::MethodAlreadyTaken, "METHOD_ALREADY_TAKEN", StatusCode::CONFLICT),
            (
                AuthError::MessageGenerationFailed,
                "FAIL_GENERATE_MESSAGE",
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AuthError::Validation("bad".to_string()),
                "VALIDATION_ERROR",
                StatusCode::BAD_REQUEST,
            ),
            (
                AuthError::ServiceUnavailable("down".to_string()),
                "SERVICE_UNAVAILABLE",
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (auth_error, code, status) in cases {
            let api_error = ApiError::from(auth_error);
            assert_eq!(api_error.error_code(), code);
            assert_eq!(api_error.status_code(), status);
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::NotFound("test".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::TooManyRequests.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::DatabaseError("test".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError::MethodAlreadyTaken.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_json_rejection_is_validation_error() {
        use axum::{body::Body, extract::FromRequest, http::Request};

        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"publicKey":"abc"}"#))
            .unwrap();

        let rejection = Json::<crate::models::LoginData>::from_request(request, &())
            .await
            .unwrap_err();
        let api_error = ApiError::from(rejection);

        assert_eq!(api_error.error_code(), "VALIDATION_ERROR");
        assert_eq!(api_error.status_code(), StatusCode::BAD_REQUEST);
    }
}
