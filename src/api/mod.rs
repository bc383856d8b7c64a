//! API Module
//!
//! HTTP handlers and routing for the table cache REST API. Every facade
//! operation is exposed per table under `/tables/:table/...`; see
//! [`create_router`] for the full list.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
