//! Tombstone Compaction Task
//!
//! Background task that periodically rebuilds a tombstoned ordered structure
//! once enough deletes have piled up, but only inside the configured
//! low-traffic hours.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Timelike};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheEngine;
use crate::config::CompactionPolicy;
use crate::store::Store;

/// Spawns the compaction loop for one table.
///
/// Every `check_interval_secs` the task checks the local hour against the
/// window and the tombstone count against the thresholds, and compacts when
/// both allow it. Abort the returned handle to stop it.
pub fn spawn_compaction_task<S: Store>(
    engine: Arc<CacheEngine<S>>,
    policy: CompactionPolicy,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(policy.check_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting compaction task for '{}' every {} seconds, window {}..={}h",
            engine.table_name(),
            interval.as_secs(),
            policy.window_start_hour,
            policy.window_end_hour
        );

        loop {
            tokio::time::sleep(interval).await;
            run_once(&engine, &policy, Local::now().hour()).await;
        }
    })
}

/// One check. Returns the number of tombstones reclaimed.
pub(crate) async fn run_once<S: Store>(
    engine: &CacheEngine<S>,
    policy: &CompactionPolicy,
    hour: u32,
) -> usize {
    if !policy.in_window(hour) {
        debug!("Compaction for '{}' skipped: hour {} outside window", engine.table_name(), hour);
        return 0;
    }
    if !engine.compaction_due(policy).await {
        debug!("Compaction for '{}' not due", engine.table_name());
        return 0;
    }
    engine.compact().await
}
