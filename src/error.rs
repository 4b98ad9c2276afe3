// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Session is too old for this operation, sign in again")]
    StaleSession,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Generation service error: {0}")]
    Generation(String),

    #[error("Identity service error: {0}")]
    Identity(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Errors that mean the caller must authenticate again.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            AppError::Unauthorized | AppError::InvalidToken | AppError::StaleSession
        )
    }
}

/// Failure to turn a source image plus customization into an encoded raster.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("Source image could not be decoded: {0}")]
    Decode(String),

    #[error("Source image is blocked by cross-origin restrictions")]
    CrossOrigin,

    #[error("Source URL is not allowed: {0}")]
    Blocked(String),

    #[error("Encoded image is too large ({len} > {max} characters)")]
    TooLarge { len: usize, max: usize },

    #[error("Image encoding failed: {0}")]
    Encode(String),
}

/// Save tier names, in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveTier {
    Direct,
    ServiceFallback,
    Minimal,
}

impl fmt::Display for SaveTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaveTier::Direct => "direct",
            SaveTier::ServiceFallback => "service_fallback",
            SaveTier::Minimal => "minimal",
        };
        f.write_str(name)
    }
}

/// Every save tier failed; nothing was committed.
#[derive(Debug)]
pub struct PersistenceError {
    pub failures: Vec<(SaveTier, AppError)>,
}

impl PersistenceError {
    /// The error raised by the last tier attempted.
    pub fn cause(&self) -> Option<&AppError> {
        self.failures.last().map(|(_, e)| e)
    }
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failures.last() {
            Some((tier, cause)) => write!(
                f,
                "All {} save tiers failed (last: {}: {})",
                self.failures.len(),
                tier,
                cause
            ),
            None => f.write_str("No save tier was attempted"),
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::StaleSession => (
                StatusCode::UNAUTHORIZED,
                "stale_session",
                Some(self.to_string()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::InvalidState(msg) => {
                (StatusCode::CONFLICT, "invalid_state", Some(msg.clone()))
            }
            AppError::Render(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "render_error",
                Some(err.to_string()),
            ),
            AppError::Persistence(err) => {
                tracing::error!(error = %err, "Persistence error");
                (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error", None)
            }
            AppError::Generation(msg) => {
                (StatusCode::BAD_GATEWAY, "generation_error", Some(msg.clone()))
            }
            AppError::Identity(msg) => {
                (StatusCode::BAD_GATEWAY, "identity_error", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
