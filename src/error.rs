//! Error types for Kara.
//!
//! Every failure that can cross an async boundary is one of these variants.
//! Handlers and the dashboard convert them into a user-visible message; the
//! detailed `Display` text is for logs only.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KaraError>;

#[derive(Error, Debug)]
pub enum KaraError {
    /// A required field was missing before a write or request.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The complaint store could not complete the operation.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An upstream API (AQI or generative text) returned a non-success status
    /// or could not be reached.
    #[error("upstream API error: {0}")]
    UpstreamApi(String),

    /// An upstream payload did not match the expected shape.
    #[error("unexpected response shape: {0}")]
    Parse(String),
}

impl KaraError {
    /// The generic message shown to end users.
    pub fn user_message(&self) -> String {
        match self {
            KaraError::Validation(msg) => msg.clone(),
            KaraError::NotFound(_) => "That report no longer exists.".to_string(),
            KaraError::StoreUnavailable(_) | KaraError::UpstreamApi(_) | KaraError::Parse(_) => {
                "Could not complete the request. Please try again later.".to_string()
            }
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            KaraError::Validation(_) => StatusCode::BAD_REQUEST,
            KaraError::NotFound(_) => StatusCode::NOT_FOUND,
            KaraError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            KaraError::UpstreamApi(_) | KaraError::Parse(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<sqlx::Error> for KaraError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => KaraError::NotFound("row not found".to_string()),
            other => KaraError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for KaraError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            KaraError::Parse(err.to_string())
        } else {
            // Strip the URL so API keys in query strings never reach logs
            KaraError::UpstreamApi(err.without_url().to_string())
        }
    }
}

impl IntoResponse for KaraError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.user_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: KaraError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, KaraError::NotFound(_)));
    }

    #[test]
    fn test_pool_errors_map_to_store_unavailable() {
        let err: KaraError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, KaraError::StoreUnavailable(_)));
    }

    #[test]
    fn test_user_message_hides_details() {
        let err = KaraError::UpstreamApi("status 500: internal".to_string());
        assert!(!err.user_message().contains("500"));

        let err = KaraError::Validation("Please fill in all fields.".to_string());
        assert_eq!(err.user_message(), "Please fill in all fields.");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            KaraError::Validation(String::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            KaraError::NotFound(String::new()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            KaraError::StoreUnavailable(String::new()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            KaraError::Parse(String::new()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
