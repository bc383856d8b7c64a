//! Configuration Module
//!
//! Loads the table list, write-behind policy and compaction policy from a JSON
//! file, with environment variable overrides for the process-level settings.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};
use crate::sort::SortMode;

/// Server configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file backing every cached table
    pub database_path: String,
    /// HTTP server port
    pub server_port: u16,
    /// Write-behind settings shared by every queued table
    pub sync: SyncPolicy,
    /// Tombstone compaction settings
    pub compaction: CompactionPolicy,
    /// Tables to cache
    pub tables: Vec<TableConfig>,
}

impl Config {
    /// Loads the configuration file and applies environment overrides.
    ///
    /// # Environment Variables
    /// - `CACHE_CONFIG` - Path of the JSON config file (default: ./cache.json)
    /// - `SERVER_PORT` - HTTP server port (overrides the file)
    /// - `DATABASE_PATH` - SQLite database file (overrides the file)
    pub fn from_env() -> Result<Self> {
        let path = env::var("CACHE_CONFIG").unwrap_or_else(|_| "./cache.json".to_string());
        let mut config = Self::from_file(&path)?;

        if let Some(port) = env::var("SERVER_PORT").ok().and_then(|v| v.parse().ok()) {
            config.server_port = port;
        }
        if let Ok(database_path) = env::var("DATABASE_PATH") {
            config.database_path = database_path;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| CacheError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&raw)
    }

    /// Parses a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| CacheError::Config(e.to_string()))
    }

    /// Rejects configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.tables.is_empty() {
            return Err(CacheError::Config("no tables configured".to_string()));
        }

        let mut seen = HashSet::new();
        for table in &self.tables {
            table.validate()?;
            if !seen.insert(table.table_name.as_str()) {
                return Err(CacheError::Config(format!(
                    "table '{}' is configured twice",
                    table.table_name
                )));
            }
        }

        if self.sync.queue_capacity == 0 {
            return Err(CacheError::Config("sync.queue_capacity must be positive".to_string()));
        }
        if self.compaction.window_start_hour > 23 || self.compaction.window_end_hour > 23 {
            return Err(CacheError::Config(
                "compaction window hours must be within 0..=23".to_string(),
            ));
        }
        if self.compaction.ratio_divisor == 0 {
            return Err(CacheError::Config(
                "compaction.ratio_divisor must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "./rowcache.sqlite".to_string(),
            server_port: 3000,
            sync: SyncPolicy::default(),
            compaction: CompactionPolicy::default(),
            tables: Vec::new(),
        }
    }
}

// == Table Config ==
/// Ordered structure kept next to the primary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    /// Contiguous sorted sequence
    #[serde(alias = "slice")]
    SortedSlice,
    /// Sequence with delete markers, compacted in the background
    #[serde(alias = "sliceNotDel")]
    TombstoneSlice,
    /// Doubly linked list
    #[serde(alias = "link")]
    LinkedList,
}

/// How one table is loaded and kept in sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub table_name: String,
    /// Cached columns; must include the primary key
    pub columns: Vec<String>,
    pub pkey: String,
    /// Filter applied when loading, without the `WHERE` keyword
    #[serde(default, rename = "where")]
    pub where_clause: Option<String>,
    /// Full ORDER BY clause, e.g. `order by age desc`
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default)]
    pub pkey_auto_increment: bool,
    /// No ordered structure when absent
    #[serde(default)]
    pub cache_type: Option<CacheKind>,
    /// Write to the store synchronously instead of queueing
    #[serde(default)]
    pub is_realtime: bool,
    /// Queued writes wait for the store's answer
    #[serde(default)]
    pub wait_for_result: bool,
}

impl TableConfig {
    /// Creates a minimal config caching `columns` keyed by `pkey`.
    pub fn new(table_name: &str, pkey: &str, columns: &[&str]) -> Self {
        Self {
            table_name: table_name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            pkey: pkey.to_string(),
            where_clause: None,
            order_by: None,
            pkey_auto_increment: false,
            cache_type: None,
            is_realtime: false,
            wait_for_result: false,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.table_name.trim().is_empty() {
            return Err(CacheError::Config("table_name cannot be empty".to_string()));
        }
        if self.columns.is_empty() {
            return Err(CacheError::Config(format!(
                "table '{}' has no columns",
                self.table_name
            )));
        }
        if !self.columns.iter().any(|c| c == &self.pkey) {
            return Err(CacheError::Config(format!(
                "table '{}': pkey '{}' is not a cached column",
                self.table_name, self.pkey
            )));
        }
        Ok(())
    }

    /// Column the ordered structure sorts by: the first ORDER BY column, or
    /// the primary key when there is no ORDER BY.
    pub fn sort_column(&self) -> String {
        self.order_tokens()
            .and_then(|tokens| tokens.into_iter().next())
            .unwrap_or_else(|| self.pkey.clone())
    }

    /// Direction from the ORDER BY clause; `None` without one.
    pub fn sort_mode(&self) -> Option<SortMode> {
        let tokens = self.order_tokens()?;
        match tokens.get(1) {
            Some(dir) if dir.eq_ignore_ascii_case("desc") => Some(SortMode::Desc),
            _ => Some(SortMode::Asc),
        }
    }

    /// Words after `order by`, up to the first comma.
    fn order_tokens(&self) -> Option<Vec<String>> {
        let clause = self.order_by.as_deref()?.trim();
        let lower = clause.to_ascii_lowercase();
        let start = lower.find("order by")? + "order by".len();
        let first = clause[start..].split(',').next()?;
        let tokens: Vec<String> = first.split_whitespace().map(String::from).collect();
        (!tokens.is_empty()).then_some(tokens)
    }
}

// == Sync Policy ==
/// What a queued write does when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpressurePolicy {
    /// Drop the write and log a warning
    #[default]
    DropAndLog,
    /// Wait for room in the queue
    Block,
}

/// Write-behind queue and journal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncPolicy {
    pub queue_capacity: usize,
    pub journal_dir: String,
    pub journal_file_name: String,
    pub failed_journal_file_name: String,
    /// Journals are rotated once they reach this size
    pub max_journal_bytes: u64,
    /// Pause before the single retry of a failed write
    pub retry_delay_ms: u64,
    pub backpressure: BackpressurePolicy,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            journal_dir: "./".to_string(),
            journal_file_name: "async_sql.sql".to_string(),
            failed_journal_file_name: "async_sql_failed.sql".to_string(),
            max_journal_bytes: 100 * 1024 * 1024,
            retry_delay_ms: 500,
            backpressure: BackpressurePolicy::DropAndLog,
        }
    }
}

// == Compaction Policy ==
/// When tombstoned slices are rebuilt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionPolicy {
    pub check_interval_secs: u64,
    /// First local hour of the window, inclusive
    pub window_start_hour: u32,
    /// Last local hour of the window, inclusive
    pub window_end_hour: u32,
    /// Compact once tombstones exceed this count
    pub absolute_threshold: usize,
    /// ...or exceed `raw_len / ratio_divisor`
    pub ratio_divisor: usize,
}

impl CompactionPolicy {
    /// True when `hour` falls in the window. A window whose start is after its
    /// end wraps past midnight.
    pub fn in_window(&self, hour: u32) -> bool {
        if self.window_start_hour <= self.window_end_hour {
            (self.window_start_hour..=self.window_end_hour).contains(&hour)
        } else {
            hour >= self.window_start_hour || hour <= self.window_end_hour
        }
    }
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            check_interval_secs: 3600,
            window_start_hour: 1,
            window_end_hour: 5,
            absolute_threshold: 10_000,
            ratio_divisor: 3,
        }
    }
}
