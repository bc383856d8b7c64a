//! SQLite-backed store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{types::ValueRef, Connection};
use tracing::debug;

use super::{ColumnMetadata, ExecOutcome, QueryResult, Store, StoreError};

/// A [`Store`] over one SQLite connection.
///
/// Calls run on tokio's blocking pool; the connection is serialized behind a
/// mutex.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self::from_connection(conn))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs several `;`-separated statements synchronously. Used for schema setup.
    pub fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::new(format!("store task failed: {}", e)))?
    }
}

impl Store for SqliteStore {
    async fn execute(&self, sql: &str) -> Result<ExecOutcome, StoreError> {
        let sql = sql.to_string();
        self.with_conn(move |conn| run_execute(conn, &sql)).await
    }

    async fn query(&self, sql: &str) -> Result<QueryResult, StoreError> {
        let sql = sql.to_string();
        self.with_conn(move |conn| run_query(conn, &sql)).await
    }
}

fn run_execute(conn: &Connection, sql: &str) -> Result<ExecOutcome, StoreError> {
    let rows_affected = conn.execute(sql, [])? as u64;
    let is_insert = sql
        .trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("insert"));
    let last_insert_id = if is_insert && rows_affected > 0 {
        u64::try_from(conn.last_insert_rowid()).ok()
    } else {
        None
    };

    debug!(rows_affected, ?last_insert_id, "statement executed");
    Ok(ExecOutcome {
        rows_affected,
        last_insert_id,
    })
}

fn run_query(conn: &Connection, sql: &str) -> Result<QueryResult, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let declared = match source_table(sql) {
        Some(table) => declared_columns(conn, &table)?,
        None => HashMap::new(),
    };
    let columns = names
        .iter()
        .map(|name| describe_column(name, declared.get(name)))
        .collect();

    let width = names.len();
    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(text_value(row.get_ref(i)?));
        }
        rows.push(values);
    }

    Ok(QueryResult { columns, rows })
}

fn text_value(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Declared type and NOT NULL flag of every column of `table`.
fn declared_columns(
    conn: &Connection,
    table: &str,
) -> Result<HashMap<String, (String, bool)>, StoreError> {
    let mut stmt = conn.prepare(r#"SELECT name, type, "notnull" FROM pragma_table_info(?1)"#)?;
    let rows = stmt.query_map([table], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)? != 0,
        ))
    })?;

    let mut declared = HashMap::new();
    for row in rows {
        let (name, type_name, not_null) = row?;
        declared.insert(name, (type_name, not_null));
    }
    Ok(declared)
}

fn describe_column(name: &str, declared: Option<&(String, bool)>) -> ColumnMetadata {
    match declared {
        Some((type_name, not_null)) => ColumnMetadata {
            name: name.to_string(),
            type_name: type_name.to_ascii_uppercase(),
            nullable: Some(!not_null),
            length: declared_length(type_name),
        },
        None => ColumnMetadata {
            name: name.to_string(),
            type_name: String::new(),
            nullable: None,
            length: None,
        },
    }
}

/// `VARCHAR(32)` declares length 32.
fn declared_length(type_name: &str) -> Option<i64> {
    let open = type_name.find('(')?;
    let close = type_name[open..].find(')')? + open;
    type_name[open + 1..close].split(',').next()?.trim().parse().ok()
}

/// Name of the table following the first `FROM` keyword.
fn source_table(sql: &str) -> Option<String> {
    let mut tokens = sql.split_whitespace();
    tokens.find(|t| t.eq_ignore_ascii_case("from"))?;
    let table = tokens
        .next()?
        .trim_matches(|c| c == '`' || c == '"' || c == ';');
    (!table.is_empty()).then(|| table.to_string())
}
