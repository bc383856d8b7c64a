//! Backing Store Module
//!
//! The capability the cache needs from the relational store behind it: run a
//! statement, run a query and describe the result columns.

mod sqlite;

use std::future::Future;

use thiserror::Error;

pub use sqlite::SqliteStore;

// == Store Error ==
/// Error raised by a backing store.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError(err.to_string())
    }
}

// == Column Metadata ==
/// Declared type facts for one result column, captured at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetadata {
    pub name: String,
    /// Upper-case declared type, e.g. `INTEGER` or `VARCHAR(32)`
    pub type_name: String,
    /// `None` when the store cannot tell
    pub nullable: Option<bool>,
    pub length: Option<i64>,
}

impl ColumnMetadata {
    /// True when literals for this column are written unquoted.
    pub fn is_numeric(&self) -> bool {
        let ty = self.type_name.to_ascii_uppercase();
        ty.contains("INT")
            || matches!(
                base_type(&ty),
                "FLOAT" | "DOUBLE" | "DECIMAL" | "REAL" | "NUMERIC"
            )
    }

    /// True when the store refuses an empty value for this column.
    pub fn rejects_empty(&self) -> bool {
        self.nullable == Some(false)
    }
}

/// Strips a precision suffix: `DECIMAL(10,2)` becomes `DECIMAL`.
fn base_type(ty: &str) -> &str {
    ty.split('(').next().unwrap_or(ty).trim()
}

// == Outcomes ==
/// Result of a mutating statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    /// Key generated by the last auto-increment insert, when known
    pub last_insert_id: Option<u64>,
}

/// Result of a query: column descriptions plus rows of nullable text values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<Vec<Option<String>>>,
}

// == Store Trait ==
/// A relational store the cache mirrors.
pub trait Store: Send + Sync + 'static {
    /// Runs a mutating statement.
    fn execute(&self, sql: &str) -> impl Future<Output = Result<ExecOutcome, StoreError>> + Send;

    /// Runs a query and returns every row.
    fn query(&self, sql: &str) -> impl Future<Output = Result<QueryResult, StoreError>> + Send;
}
