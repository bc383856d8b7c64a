//! Request DTOs for the table cache API
//!
//! Defines incoming HTTP bodies and query strings.

use serde::Deserialize;

/// Body for inserts (POST rows) and multi-column updates (PATCH row).
///
/// `assignments` is a `col=value[,col=value]*` list.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentsRequest {
    pub assignments: String,
}

/// Body for a single column update (PUT row column).
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnValueRequest {
    pub value: String,
}

/// Query string for predicate scans.
#[derive(Debug, Clone, Deserialize)]
pub struct WhereQuery {
    pub predicate: String,
}

/// Query string for positional ranges: rows `[start, end)`.
#[derive(Debug, Clone, Deserialize)]
pub struct BetweenQuery {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageSizeQuery {
    pub page_size: usize,
}

/// Query string for reading several consecutive pages.
#[derive(Debug, Clone, Deserialize)]
pub struct MultipageQuery {
    pub start_page: usize,
    pub page_count: usize,
    pub page_size: usize,
}
