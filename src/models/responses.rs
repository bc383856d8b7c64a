//! Response DTOs for the table cache API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheStats, Row};

/// Response body for a single row (GET row)
#[derive(Debug, Clone, Serialize)]
pub struct RowResponse {
    pub table: String,
    pub pkey: String,
    pub row: Row,
}

impl RowResponse {
    pub fn new(table: impl Into<String>, pkey: impl Into<String>, row: Row) -> Self {
        Self {
            table: table.into(),
            pkey: pkey.into(),
            row,
        }
    }
}

/// Response body for scans, ranges and pages.
///
/// `rows` keeps the order the cache returned them in.
#[derive(Debug, Clone, Serialize)]
pub struct RowsResponse {
    pub table: String,
    pub count: usize,
    pub rows: Vec<Row>,
}

impl RowsResponse {
    pub fn new(table: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            table: table.into(),
            count: rows.len(),
            rows,
        }
    }
}

/// Response body for a single column (GET row column)
#[derive(Debug, Clone, Serialize)]
pub struct ColumnResponse {
    pub table: String,
    pub pkey: String,
    pub column: String,
    pub value: String,
}

/// Response body for inserts, updates and deletes.
#[derive(Debug, Clone, Serialize)]
pub struct WriteResponse {
    /// Success message
    pub message: String,
    pub table: String,
    /// 0 when the write was queued without waiting for the store
    pub rows_affected: u64,
}

impl WriteResponse {
    pub fn new(table: impl Into<String>, action: &str, rows_affected: u64) -> Self {
        let table = table.into();
        Self {
            message: format!("{} on '{}' accepted", action, table),
            table,
            rows_affected,
        }
    }
}

/// Response body for the page count endpoint
#[derive(Debug, Clone, Serialize)]
pub struct PageCountResponse {
    pub table: String,
    pub page_size: usize,
    pub page_count: usize,
}

/// Response body for the stats endpoint
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Response body for the table listing
#[derive(Debug, Clone, Serialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
