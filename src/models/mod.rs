//! Request and Response models for the table cache API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{
    AssignmentsRequest, BetweenQuery, ColumnValueRequest, MultipageQuery, PageSizeQuery,
    WhereQuery,
};
pub use responses::{
    ColumnResponse, ErrorResponse, HealthResponse, PageCountResponse, RowResponse, RowsResponse,
    StatsResponse, TablesResponse, WriteResponse,
};
