//! Error types for the table cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::store::StoreError;

// == Cache Error Enum ==
/// Unified error type for the table cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Malformed table or sync configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Initial connect or warm-up query failure
    #[error("Store connection error: {0}")]
    StoreConnection(String),

    /// Row, column or table absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Empty or malformed WHERE / assignment expression
    #[error("Predicate syntax error: {0}")]
    PredicateSyntax(String),

    /// Write rejected before reaching the store
    #[error("Validation error: {0}")]
    Validation(String),

    /// The store rejected a realtime write; the cache was left unchanged
    #[error("Synchronous write failed: {0}")]
    SynchronousWrite(String),

    /// A queued write failed after its retry
    #[error("Queued write failed: {0}")]
    QueuedWrite(String),

    /// The write-behind queue was full and the write was dropped
    #[error("Write queue full: {0}")]
    CapacityExceeded(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Wraps a store failure raised while warming the cache.
    pub fn connection(context: &str, err: StoreError) -> Self {
        CacheError::StoreConnection(format!("{}: {}", context, err))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::PredicateSyntax(_) | CacheError::Validation(_) => StatusCode::BAD_REQUEST,
            CacheError::SynchronousWrite(_) | CacheError::QueuedWrite(_) => StatusCode::BAD_GATEWAY,
            CacheError::CapacityExceeded(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Config(_) | CacheError::StoreConnection(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the table cache.
pub type Result<T> = std::result::Result<T, CacheError>;
