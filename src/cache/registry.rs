//! Table Registry
//!
//! One cache engine per configured table, built at startup and read-only
//! afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{CacheKind, Config};
use crate::error::{CacheError, Result};
use crate::store::Store;
use crate::tasks::spawn_compaction_task;

use super::engine::CacheEngine;

/// The set of cached tables.
pub struct Registry<S: Store> {
    tables: HashMap<String, Arc<CacheEngine<S>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<S: Store> Registry<S> {
    /// Loads every configured table and starts compaction for tombstoned ones.
    pub async fn build(store: Arc<S>, config: &Config) -> Result<Self> {
        let mut tables = HashMap::new();
        let mut tasks = Vec::new();

        for table in &config.tables {
            let engine = CacheEngine::load(Arc::clone(&store), table.clone(), &config.sync).await?;
            let engine = Arc::new(engine);

            if table.cache_type == Some(CacheKind::TombstoneSlice) {
                tasks.push(spawn_compaction_task(Arc::clone(&engine), config.compaction.clone()));
            }
            tables.insert(table.table_name.clone(), engine);
        }

        info!("Registry ready with {} tables", tables.len());
        Ok(Self {
            tables,
            tasks: Mutex::new(tasks),
        })
    }

    pub fn get(&self, table: &str) -> Option<Arc<CacheEngine<S>>> {
        self.tables.get(table).cloned()
    }

    /// Like [`Registry::get`], failing with `NotFound` for unknown tables.
    pub fn table(&self, table: &str) -> Result<Arc<CacheEngine<S>>> {
        self.get(table)
            .ok_or_else(|| CacheError::NotFound(format!("table '{}'", table)))
    }

    /// Names of all cached tables, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Stops background tasks and drains every write queue.
    pub async fn shutdown(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            task.abort();
        }
        for engine in self.tables.values() {
            engine.close().await;
        }
        info!("Registry shut down");
    }
}
