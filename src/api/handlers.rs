//! API Handlers
//!
//! HTTP request handlers, one per cache operation.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::Registry;
use crate::error::Result;
use crate::models::{
    AssignmentsRequest, BetweenQuery, ColumnResponse, ColumnValueRequest, HealthResponse,
    MultipageQuery, PageCountResponse, PageSizeQuery, RowResponse, RowsResponse, StatsResponse,
    TablesResponse, WhereQuery, WriteResponse,
};
use crate::store::Store;

/// Application state shared across all handlers.
pub struct AppState<S: Store> {
    /// Every cached table
    pub registry: Arc<Registry<S>>,
}

impl<S: Store> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<S: Store> AppState<S> {
    /// Creates a new AppState around a shared registry.
    pub fn new(registry: Arc<Registry<S>>) -> Self {
        Self { registry }
    }
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /tables
pub async fn tables_handler<S: Store>(State(state): State<AppState<S>>) -> Json<TablesResponse> {
    Json(TablesResponse {
        tables: state.registry.table_names(),
    })
}

/// Handler for GET /tables/:table/stats
pub async fn stats_handler<S: Store>(
    State(state): State<AppState<S>>,
    Path(table): Path<String>,
) -> Result<Json<StatsResponse>> {
    let engine = state.registry.table(&table)?;
    Ok(Json(StatsResponse::from(engine.stats().await)))
}

/// Handler for GET /tables/:table/rows/:pkey
pub async fn get_row_handler<S: Store>(
    State(state): State<AppState<S>>,
    Path((table, pkey)): Path<(String, String)>,
) -> Result<Json<RowResponse>> {
    let engine = state.registry.table(&table)?;
    let row = engine.get_row(&pkey).await?;
    Ok(Json(RowResponse::new(table, pkey, row)))
}

/// Handler for GET /tables/:table/rows/:pkey/:column
pub async fn get_column_handler<S: Store>(
    State(state): State<AppState<S>>,
    Path((table, pkey, column)): Path<(String, String, String)>,
) -> Result<Json<ColumnResponse>> {
    let engine = state.registry.table(&table)?;
    let value = engine.get_column(&pkey, &column).await?;
    Ok(Json(ColumnResponse {
        table,
        pkey,
        column,
        value,
    }))
}

/// Handler for DELETE /tables/:table/rows/:pkey
pub async fn delete_row_handler<S: Store>(
    State(state): State<AppState<S>>,
    Path((table, pkey)): Path<(String, String)>,
) -> Result<Json<WriteResponse>> {
    let engine = state.registry.table(&table)?;
    let affected = engine.del_row(&pkey).await?;
    Ok(Json(WriteResponse::new(table, "delete", affected)))
}

/// Handler for PUT /tables/:table/rows/:pkey/:column
pub async fn update_column_handler<S: Store>(
    State(state): State<AppState<S>>,
    Path((table, pkey, column)): Path<(String, String, String)>,
    Json(req): Json<ColumnValueRequest>,
) -> Result<Json<WriteResponse>> {
    let engine = state.registry.table(&table)?;
    let affected = engine.update_column(&pkey, &column, &req.value).await?;
    Ok(Json(WriteResponse::new(table, "update", affected)))
}

/// Handler for PATCH /tables/:table/rows/:pkey
pub async fn update_columns_handler<S: Store>(
    State(state): State<AppState<S>>,
    Path((table, pkey)): Path<(String, String)>,
    Json(req): Json<AssignmentsRequest>,
) -> Result<Json<WriteResponse>> {
    let engine = state.registry.table(&table)?;
    let affected = engine.update_columns(&pkey, &req.assignments).await?;
    Ok(Json(WriteResponse::new(table, "update", affected)))
}

/// Handler for POST /tables/:table/rows
pub async fn insert_row_handler<S: Store>(
    State(state): State<AppState<S>>,
    Path(table): Path<String>,
    Json(req): Json<AssignmentsRequest>,
) -> Result<Json<WriteResponse>> {
    let engine = state.registry.table(&table)?;
    let affected = engine.insert_row(&req.assignments).await?;
    Ok(Json(WriteResponse::new(table, "insert", affected)))
}

/// Handler for GET /tables/:table/where?predicate=..
pub async fn where_handler<S: Store>(
    State(state): State<AppState<S>>,
    Path(table): Path<String>,
    Query(query): Query<WhereQuery>,
) -> Result<Json<RowsResponse>> {
    let engine = state.registry.table(&table)?;
    let rows = engine.get_where(&query.predicate).await?;
    Ok(Json(RowsResponse::new(table, rows)))
}

/// Handler for GET /tables/:table/between?start=..&end=..
pub async fn between_handler<S: Store>(
    State(state): State<AppState<S>>,
    Path(table): Path<String>,
    Query(query): Query<BetweenQuery>,
) -> Result<Json<RowsResponse>> {
    let engine = state.registry.table(&table)?;
    let rows = engine.get_row_between(query.start, query.end).await;
    Ok(Json(RowsResponse::new(table, rows)))
}

/// Handler for GET /tables/:table/pages/count?page_size=..
pub async fn page_count_handler<S: Store>(
    State(state): State<AppState<S>>,
    Path(table): Path<String>,
    Query(query): Query<PageSizeQuery>,
) -> Result<Json<PageCountResponse>> {
    let engine = state.registry.table(&table)?;
    let page_count = engine.get_page_count(query.page_size).await;
    Ok(Json(PageCountResponse {
        table,
        page_size: query.page_size,
        page_count,
    }))
}

/// Handler for GET /tables/:table/pages/:page?page_size=..
pub async fn page_handler<S: Store>(
    State(state): State<AppState<S>>,
    Path((table, page)): Path<(String, usize)>,
    Query(query): Query<PageSizeQuery>,
) -> Result<Json<RowsResponse>> {
    let engine = state.registry.table(&table)?;
    let rows = engine.get_one_page_rows(page, query.page_size).await;
    Ok(Json(RowsResponse::new(table, rows)))
}

/// Handler for GET /tables/:table/pages?start_page=..&page_count=..&page_size=..
pub async fn multipage_handler<S: Store>(
    State(state): State<AppState<S>>,
    Path(table): Path<String>,
    Query(query): Query<MultipageQuery>,
) -> Result<Json<RowsResponse>> {
    let engine = state.registry.table(&table)?;
    let rows = engine
        .get_multipage_rows(query.start_page, query.page_count, query.page_size)
        .await;
    Ok(Json(RowsResponse::new(table, rows)))
}
