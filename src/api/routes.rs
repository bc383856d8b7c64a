//! API Routes
//!
//! Configures the Axum router with every table cache endpoint.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    between_handler, delete_row_handler, get_column_handler, get_row_handler, health_handler,
    insert_row_handler, multipage_handler, page_count_handler, page_handler, stats_handler,
    tables_handler, update_column_handler, update_columns_handler, where_handler, AppState,
};
use crate::store::Store;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /tables` - Cached table names
/// - `GET /tables/:table/stats` - Table statistics
/// - `GET|DELETE|PATCH /tables/:table/rows/:pkey` - Read, delete or update a row
/// - `GET|PUT /tables/:table/rows/:pkey/:column` - Read or update one column
/// - `POST /tables/:table/rows` - Insert a row
/// - `GET /tables/:table/where` - Predicate scan
/// - `GET /tables/:table/between` - Positional range
/// - `GET /tables/:table/pages/count` - Page count
/// - `GET /tables/:table/pages/:page` - One page
/// - `GET /tables/:table/pages` - Several consecutive pages
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router<S: Store>(state: AppState<S>) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/tables", get(tables_handler::<S>))
        .route("/tables/:table/stats", get(stats_handler::<S>))
        .route("/tables/:table/rows", post(insert_row_handler::<S>))
        .route(
            "/tables/:table/rows/:pkey",
            get(get_row_handler::<S>)
                .delete(delete_row_handler::<S>)
                .patch(update_columns_handler::<S>),
        )
        .route(
            "/tables/:table/rows/:pkey/:column",
            get(get_column_handler::<S>).put(update_column_handler::<S>),
        )
        .route("/tables/:table/where", get(where_handler::<S>))
        .route("/tables/:table/between", get(between_handler::<S>))
        .route("/tables/:table/pages", get(multipage_handler::<S>))
        .route("/tables/:table/pages/count", get(page_count_handler::<S>))
        .route("/tables/:table/pages/:page", get(page_handler::<S>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
