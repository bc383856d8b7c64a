//! Cache Engine Module
//!
//! The per-table facade: a concurrent primary index, an optional ordered
//! structure for ranges and pages, and the write path to the backing store.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::config::{CompactionPolicy, SyncPolicy, TableConfig};
use crate::error::{CacheError, Result};
use crate::queue::WriteBehindQueue;
use crate::sort::{Collation, SortMode};
use crate::store::{ColumnMetadata, ExecOutcome, Store};

use super::condition::{parse_assignments, Predicate};
use super::entry::{share, snapshot, OrderedEntry, Row, SharedRow, NULL_SENTINEL};
use super::ordered::{new_ordered_store, OrderLayout, OrderedStore};
use super::sql::{self, ColumnTypes};
use super::stats::CacheStats;

type OrderedLock = RwLock<Box<dyn OrderedStore>>;

// == Cache Engine ==
/// In-memory mirror of one table.
///
/// Mutations reach the store first (or the write-behind queue) and are then
/// applied to the primary index and the ordered structure. The ordered
/// structure's write lock is taken before the primary index changes, so a
/// reader never sees the two disagree.
pub struct CacheEngine<S: Store> {
    store: Arc<S>,
    config: TableConfig,
    sort_column: String,
    sort_mode: SortMode,
    column_types: ColumnTypes,
    rows: DashMap<String, SharedRow>,
    ordered: Option<OrderedLock>,
    queue: Option<WriteBehindQueue>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<S: Store> CacheEngine<S> {
    // == Constructor ==
    /// Loads the table from the store and starts its write queue.
    ///
    /// Fails with `StoreConnection` when the warm-up query fails and with
    /// `Config` when the result lacks the primary key column.
    pub async fn load(store: Arc<S>, config: TableConfig, sync: &SyncPolicy) -> Result<Self> {
        let select = sql::select(&config);
        let result = store
            .query(&select)
            .await
            .map_err(|e| CacheError::connection(&format!("loading '{}'", config.table_name), e))?;

        let pkey_index = result
            .columns
            .iter()
            .position(|c| c.name == config.pkey)
            .ok_or_else(|| {
                CacheError::Config(format!(
                    "table '{}': pkey '{}' missing from query result",
                    config.table_name, config.pkey
                ))
            })?;
        let column_types: ColumnTypes = result
            .columns
            .iter()
            .map(|c| (c.name.clone(), c.clone()))
            .collect();

        // Numeric sort columns order by value, not by their text.
        let collation = if column_types
            .get(&config.sort_column())
            .is_some_and(ColumnMetadata::is_numeric)
        {
            Collation::Numeric
        } else {
            Collation::Text
        };
        let layout = OrderLayout {
            mode: config.sort_mode(),
            keyed_by_pkey: config.sort_column() == config.pkey,
            collation,
        };
        let mut engine = Self {
            sort_column: config.sort_column(),
            sort_mode: layout.mode.unwrap_or_default(),
            column_types,
            rows: DashMap::new(),
            ordered: None,
            queue: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            store,
            config,
        };

        let mut loaded = Vec::with_capacity(result.rows.len());
        for values in result.rows {
            let pkey = values
                .get(pkey_index)
                .cloned()
                .flatten()
                .unwrap_or_else(|| NULL_SENTINEL.to_string());
            if engine.rows.contains_key(&pkey) {
                warn!(
                    "Table '{}': duplicate pkey '{}' in load, keeping the first row",
                    engine.config.table_name, pkey
                );
                continue;
            }
            let row: Row = result
                .columns
                .iter()
                .zip(values)
                .map(|(c, v)| (c.name.clone(), v.unwrap_or_else(|| NULL_SENTINEL.to_string())))
                .collect();
            let row = share(row);
            loaded.push((pkey.clone(), Arc::clone(&row)));
            engine.rows.insert(pkey, row);
        }

        if let Some(kind) = engine.config.cache_type {
            // Query order is kept for structures without a sort mode.
            let entries = loaded
                .iter()
                .map(|(pkey, row)| engine.entry_for(pkey, row))
                .collect();
            let mut ordered = new_ordered_store(kind, layout);
            ordered.load(entries);
            engine.ordered = Some(RwLock::new(ordered));
        }

        if !engine.config.is_realtime {
            let queue = WriteBehindQueue::start(Arc::clone(&engine.store), &engine.config.table_name, sync)?;
            engine.queue = Some(queue);
        }

        info!(
            "Table '{}' loaded: {} rows, ordered by '{}' ({:?}), cache type {:?}, {}",
            engine.config.table_name,
            engine.rows.len(),
            engine.sort_column,
            layout.mode,
            engine.config.cache_type,
            if engine.config.is_realtime { "realtime" } else { "write-behind" }
        );
        Ok(engine)
    }

    pub fn table_name(&self) -> &str {
        &self.config.table_name
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Rows in the primary index.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    // == Reads ==
    /// Returns a copy of the row stored under `pkey`.
    pub async fn get_row(&self, pkey: &str) -> Result<Row> {
        match self.rows.get(pkey).map(|r| snapshot(r.value())) {
            Some(row) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(row)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Err(self.row_not_found(pkey))
            }
        }
    }

    /// Returns one column of the row stored under `pkey`.
    pub async fn get_column(&self, pkey: &str, column: &str) -> Result<String> {
        let value = self
            .rows
            .get(pkey)
            .map(|r| r.value().read().get(column).cloned());
        match value {
            Some(Some(value)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(value)
            }
            Some(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Err(CacheError::NotFound(format!(
                    "column '{}' of row '{}' in table '{}'",
                    column, pkey, self.config.table_name
                )))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Err(self.row_not_found(pkey))
            }
        }
    }

    /// Scans every row with a single-level predicate. Result order is unspecified.
    pub async fn get_where(&self, predicate: &str) -> Result<Vec<Row>> {
        let predicate = Predicate::parse(predicate)?;
        let matched = self
            .rows
            .iter()
            .filter_map(|entry| {
                let row = entry.value().read();
                predicate.matches(&row).then(|| row.clone())
            })
            .collect();
        Ok(matched)
    }

    /// Rows at ordered positions `[start, end)`, clamped to the current size.
    pub async fn get_row_between(&self, start: usize, end: usize) -> Vec<Row> {
        let Some(lock) = &self.ordered else {
            return Vec::new();
        };
        let shared = lock.read().await.range_between(start, end);
        shared.iter().map(snapshot).collect()
    }

    /// Number of pages of `page_size` rows; 0 when `page_size` is 0.
    pub async fn get_page_count(&self, page_size: usize) -> usize {
        if page_size == 0 {
            return 0;
        }
        match &self.ordered {
            Some(lock) => lock.read().await.len().div_ceil(page_size),
            None => 0,
        }
    }

    /// One 1-based page; `page` is clamped into `[1, page count]`.
    pub async fn get_one_page_rows(&self, page: usize, page_size: usize) -> Vec<Row> {
        self.get_multipage_rows(page, 1, page_size).await
    }

    /// `page_count` consecutive pages starting at the 1-based `start_page`.
    pub async fn get_multipage_rows(&self, start_page: usize, page_count: usize, page_size: usize) -> Vec<Row> {
        let Some(lock) = &self.ordered else {
            return Vec::new();
        };
        if page_size == 0 || page_count == 0 {
            return Vec::new();
        }

        let ordered = lock.read().await;
        let pages = ordered.len().div_ceil(page_size);
        if pages == 0 {
            return Vec::new();
        }
        let first = start_page.clamp(1, pages) - 1;
        let start = first * page_size;
        let end = first.saturating_add(page_count).saturating_mul(page_size);
        let shared = ordered.range_between(start, end);
        drop(ordered);

        shared.iter().map(snapshot).collect()
    }

    // == Writes ==
    /// Deletes the row stored under `pkey`.
    pub async fn del_row(&self, pkey: &str) -> Result<u64> {
        if !self.rows.contains_key(pkey) {
            return Err(self.row_not_found(pkey));
        }

        let statement = sql::delete(&self.config.table_name, &self.column_types, &self.config.pkey, pkey);
        let outcome = self.dispatch(statement).await?;

        let mut ordered = self.ordered_write().await;
        if let Some(ordered) = ordered.as_mut() {
            ordered.delete(pkey);
        }
        self.rows.remove(pkey);
        debug!(table = %self.config.table_name, pkey, "row deleted");
        Ok(affected(outcome))
    }

    /// Sets one column of the row stored under `pkey`.
    pub async fn update_column(&self, pkey: &str, column: &str, value: &str) -> Result<u64> {
        self.update_pairs(pkey, vec![(column.to_string(), value.to_string())])
            .await
    }

    /// Sets several columns from a `col=value[,col=value]*` list.
    pub async fn update_columns(&self, pkey: &str, assignments: &str) -> Result<u64> {
        let pairs = parse_assignments(assignments)?;
        self.update_pairs(pkey, pairs).await
    }

    async fn update_pairs(&self, pkey: &str, pairs: Vec<(String, String)>) -> Result<u64> {
        for (column, _) in &pairs {
            if *column == self.config.pkey {
                return Err(CacheError::Validation(format!(
                    "primary key '{}' cannot be updated",
                    column
                )));
            }
            if !self.is_cached(column) {
                return Err(CacheError::NotFound(format!(
                    "column '{}' is not cached for table '{}'",
                    column, self.config.table_name
                )));
            }
        }
        if !self.rows.contains_key(pkey) {
            return Err(self.row_not_found(pkey));
        }

        let statement = sql::update(
            &self.config.table_name,
            &self.column_types,
            &self.config.pkey,
            pkey,
            &pairs,
        );
        let outcome = self.dispatch(statement).await?;

        let mut ordered = self.ordered_write().await;
        let Some(row) = self.rows.get(pkey).map(|r| Arc::clone(r.value())) else {
            return Ok(affected(outcome));
        };
        let moved = {
            let mut row = row.write();
            let before = row.get(&self.sort_column).cloned();
            for (column, value) in pairs {
                row.insert(column, value);
            }
            row.get(&self.sort_column).cloned() != before
        };
        if moved {
            if let Some(ordered) = ordered.as_mut() {
                ordered.delete(pkey);
                ordered.insert(self.entry_for(pkey, &row));
            }
        }
        Ok(affected(outcome))
    }

    /// Inserts a row given as `col=value[,col=value]*`.
    ///
    /// An auto-increment table may omit the primary key; the row is then
    /// cached under the id the store reports, or only written to the store
    /// when that id is unknown.
    pub async fn insert_row(&self, assignments: &str) -> Result<u64> {
        let pairs = parse_assignments(assignments)?;

        let mut seen = HashSet::new();
        for (column, value) in &pairs {
            if !self.is_cached(column) {
                return Err(CacheError::Validation(format!(
                    "column '{}' is not cached for table '{}'",
                    column, self.config.table_name
                )));
            }
            if !seen.insert(column.as_str()) {
                return Err(CacheError::Validation(format!("column '{}' given twice", column)));
            }
            let rejects_empty = self
                .column_types
                .get(column)
                .is_some_and(|meta| meta.rejects_empty());
            if value.is_empty() && rejects_empty {
                return Err(CacheError::Validation(format!("column '{}' cannot be empty", column)));
            }
        }

        let pkey_value = pairs
            .iter()
            .find(|(column, _)| *column == self.config.pkey)
            .map(|(_, value)| value.clone());
        match &pkey_value {
            None if !self.config.pkey_auto_increment => {
                return Err(CacheError::Validation(format!(
                    "primary key '{}' is required",
                    self.config.pkey
                )));
            }
            Some(value) if value.is_empty() => {
                return Err(CacheError::Validation(format!(
                    "primary key '{}' cannot be empty",
                    self.config.pkey
                )));
            }
            Some(value) if self.rows.contains_key(value) => {
                return Err(CacheError::Validation(format!(
                    "row '{}' already exists in table '{}'",
                    value, self.config.table_name
                )));
            }
            _ => {}
        }

        let statement = sql::insert(&self.config.table_name, &self.column_types, &pairs);
        let outcome = self.dispatch(statement).await?;

        let pkey_value = match pkey_value {
            Some(value) => value,
            None => match outcome.and_then(|o| o.last_insert_id) {
                Some(id) => id.to_string(),
                None => {
                    warn!(
                        "Table '{}': generated key unknown, inserted row not cached",
                        self.config.table_name
                    );
                    return Ok(affected(outcome));
                }
            },
        };

        let mut row: Row = pairs.into_iter().collect();
        row.insert(self.config.pkey.clone(), pkey_value.clone());
        let row = share(row);

        let mut ordered = self.ordered_write().await;
        if let Some(ordered) = ordered.as_mut() {
            ordered.delete(&pkey_value);
            ordered.insert(self.entry_for(&pkey_value, &row));
        }
        self.rows.insert(pkey_value, row);
        Ok(affected(outcome))
    }

    /// Sends a statement down the table's write path.
    ///
    /// Returns the store's outcome when it is known: always for realtime
    /// tables, and for queued tables that wait for results.
    async fn dispatch(&self, statement: String) -> Result<Option<ExecOutcome>> {
        debug!(table = %self.config.table_name, sql = %statement, "dispatching write");
        match &self.queue {
            None => self
                .store
                .execute(&statement)
                .await
                .map(Some)
                .map_err(|e| CacheError::SynchronousWrite(e.to_string())),
            Some(queue) if self.config.wait_for_result => {
                queue.submit_and_wait(statement).await.map(Some)
            }
            Some(queue) => {
                queue.submit(statement).await;
                Ok(None)
            }
        }
    }

    // == Maintenance ==
    /// Current counters.
    pub async fn stats(&self) -> CacheStats {
        let (cache_type, ordered_len, ordered_raw_len, tombstones) = match &self.ordered {
            Some(lock) => {
                let ordered = lock.read().await;
                (Some(ordered.kind()), ordered.len(), ordered.raw_len(), ordered.tombstones())
            }
            None => (None, 0, 0, 0),
        };
        CacheStats {
            table: self.config.table_name.clone(),
            rows: self.rows.len(),
            cache_type,
            ordered_len,
            ordered_raw_len,
            tombstones,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            queue: self.queue.as_ref().map(|q| q.stats()).unwrap_or_default(),
        }
    }

    /// True when the ordered structure carries more tombstones than `policy` allows.
    pub async fn compaction_due(&self, policy: &CompactionPolicy) -> bool {
        let Some(lock) = &self.ordered else {
            return false;
        };
        let ordered = lock.read().await;
        let tombstones = ordered.tombstones();
        tombstones > 0
            && (tombstones > policy.absolute_threshold
                || tombstones > ordered.raw_len() / policy.ratio_divisor.max(1))
    }

    /// Rebuilds the ordered structure from the primary index and re-sorts it.
    ///
    /// Returns the number of tombstones discarded.
    pub async fn compact(&self) -> usize {
        let Some(lock) = &self.ordered else {
            return 0;
        };
        let mut ordered = lock.write().await;
        let reclaimed = ordered.tombstones();
        ordered.load(self.entries_from_index());
        info!(
            "Table '{}' compacted: {} tombstones reclaimed, {} live entries",
            self.config.table_name,
            reclaimed,
            ordered.len()
        );
        reclaimed
    }

    /// Drains the write queue. Reads keep working afterwards.
    pub async fn close(&self) {
        if let Some(queue) = &self.queue {
            queue.close().await;
        }
    }

    // == Helpers ==
    fn is_cached(&self, column: &str) -> bool {
        self.config.columns.iter().any(|c| c == column)
    }

    fn row_not_found(&self, pkey: &str) -> CacheError {
        CacheError::NotFound(format!(
            "row '{}' in table '{}'",
            pkey, self.config.table_name
        ))
    }

    fn entry_for(&self, pkey: &str, row: &SharedRow) -> OrderedEntry {
        let sort_key = row.read().get(&self.sort_column).cloned().unwrap_or_default();
        OrderedEntry::new(pkey, sort_key, self.sort_mode, Arc::clone(row))
    }

    fn entries_from_index(&self) -> Vec<OrderedEntry> {
        self.rows
            .iter()
            .map(|r| self.entry_for(r.key(), r.value()))
            .collect()
    }

    async fn ordered_write(&self) -> Option<RwLockWriteGuard<'_, Box<dyn OrderedStore>>> {
        match &self.ordered {
            Some(lock) => Some(lock.write().await),
            None => None,
        }
    }
}

fn affected(outcome: Option<ExecOutcome>) -> u64 {
    outcome.map(|o| o.rows_affected).unwrap_or(0)
}
