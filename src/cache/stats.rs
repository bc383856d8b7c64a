//! Cache Statistics Module
//!
//! Point-in-time counters for one cached table.

use serde::Serialize;

use crate::config::CacheKind;
use crate::queue::QueueStats;

// == Cache Stats ==
/// Snapshot of a table cache's size and traffic.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub table: String,
    /// Rows in the primary index
    pub rows: usize,
    pub cache_type: Option<CacheKind>,
    /// Live entries in the ordered structure
    pub ordered_len: usize,
    /// Slots in the ordered structure, tombstones included
    pub ordered_raw_len: usize,
    pub tombstones: usize,
    /// Reads that found their row or column
    pub hits: u64,
    /// Reads that did not
    pub misses: u64,
    /// Write-behind counters; zero for realtime tables
    #[serde(flatten)]
    pub queue: QueueStats,
}

impl CacheStats {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..CacheStats::default()
        };
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_serialize_flattens_queue_counters() {
        let stats = CacheStats {
            table: "users".to_string(),
            cache_type: Some(CacheKind::LinkedList),
            queue: QueueStats {
                dropped_writes: 2,
                ..QueueStats::default()
            },
            ..CacheStats::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["table"], "users");
        assert_eq!(json["cache_type"], "linked_list");
        assert_eq!(json["dropped_writes"], 2);
    }
}
