//! Engine Scenario Tests
//!
//! Drives `CacheEngine` directly against SQLite: ordering, tombstones,
//! predicates and the three write paths.

use std::sync::Arc;

use rowcache::{
    cache::CacheEngine,
    config::{CacheKind, SyncPolicy, TableConfig},
    error::CacheError,
    store::{SqliteStore, Store},
};
use tempfile::TempDir;

// == Helper Functions ==

fn people_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .execute_batch(
            "CREATE TABLE people (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                age INTEGER
             );
             INSERT INTO people VALUES ('K1', 'kim', 30), ('K2', 'kai', 20);",
        )
        .unwrap();
    store
}

fn people_table(kind: Option<CacheKind>, order_by: Option<&str>) -> TableConfig {
    let mut table = TableConfig::new("people", "id", &["id", "name", "age"]);
    table.cache_type = kind;
    table.order_by = order_by.map(str::to_string);
    table.is_realtime = true;
    table
}

fn queued_policy(dir: &TempDir) -> SyncPolicy {
    SyncPolicy {
        journal_dir: dir.path().to_string_lossy().into_owned(),
        retry_delay_ms: 10,
        ..SyncPolicy::default()
    }
}

async fn load(store: &SqliteStore, table: TableConfig) -> CacheEngine<SqliteStore> {
    CacheEngine::load(Arc::new(store.clone()), table, &SyncPolicy::default())
        .await
        .unwrap()
}

fn ids(rows: &[rowcache::cache::Row]) -> Vec<&str> {
    rows.iter().map(|r| r["id"].as_str()).collect()
}

async fn store_count(store: &SqliteStore, filter: &str) -> usize {
    let result = store
        .query(&format!("SELECT id FROM people WHERE {}", filter))
        .await
        .unwrap();
    result.rows.len()
}

// == Ordering ==

#[tokio::test]
async fn test_ascending_age_puts_younger_row_first() {
    let store = people_store();
    let engine = load(&store, people_table(Some(CacheKind::SortedSlice), Some("order by age"))).await;

    let page = engine.get_one_page_rows(1, 10).await;
    assert_eq!(ids(&page), vec!["K2", "K1"]);
    assert_eq!(engine.get_row("K1").await.unwrap()["name"], "kim");
}

#[tokio::test]
async fn test_inserted_rows_follow_sort_column() {
    let store = people_store();
    store.execute_batch("DELETE FROM people").unwrap();
    let engine = load(&store, people_table(Some(CacheKind::SortedSlice), Some("order by age"))).await;
    assert!(engine.is_empty());

    engine.insert_row("id=K1,name=A,age=30").await.unwrap();
    engine.insert_row("id=K2,name=B,age=20").await.unwrap();

    assert_eq!(ids(&engine.get_row_between(0, 2).await), vec!["K2", "K1"]);
}

#[tokio::test]
async fn test_deleted_row_disappears_from_every_kind() {
    for kind in [CacheKind::SortedSlice, CacheKind::TombstoneSlice, CacheKind::LinkedList] {
        let store = people_store();
        let engine = load(&store, people_table(Some(kind), Some("order by age"))).await;

        engine.del_row("K1").await.unwrap();

        assert!(matches!(engine.get_row("K1").await, Err(CacheError::NotFound(_))));
        let all = engine.get_row_between(0, 10).await;
        assert_eq!(ids(&all), vec!["K2"], "{:?}", kind);
    }
}

#[tokio::test]
async fn test_descending_order_by() {
    let store = people_store();
    let engine = load(
        &store,
        people_table(Some(CacheKind::LinkedList), Some("ORDER BY age DESC")),
    )
    .await;

    let page = engine.get_one_page_rows(1, 10).await;
    assert_eq!(ids(&page), vec!["K1", "K2"]);
}

#[tokio::test]
async fn test_sort_column_update_repositions_row() {
    for kind in [CacheKind::SortedSlice, CacheKind::TombstoneSlice, CacheKind::LinkedList] {
        let store = people_store();
        let engine = load(&store, people_table(Some(kind), Some("order by age"))).await;

        engine.update_column("K1", "age", "10").await.unwrap();
        if kind == CacheKind::TombstoneSlice {
            // Appended entries are only ordered again after compaction
            engine.compact().await;
        }

        let page = engine.get_one_page_rows(1, 10).await;
        assert_eq!(ids(&page), vec!["K1", "K2"], "{:?}", kind);
        assert_eq!(store_count(&store, "age = 10").await, 1);
    }
}

// == Tombstones ==

#[tokio::test]
async fn test_numeric_sort_column_orders_by_value() {
    for kind in [CacheKind::SortedSlice, CacheKind::TombstoneSlice, CacheKind::LinkedList] {
        let store = people_store();
        store
            .execute_batch("DELETE FROM people; INSERT INTO people VALUES ('K30', 'b', 30), ('K100', 'c', 100);")
            .unwrap();
        let engine = load(&store, people_table(Some(kind), Some("order by age"))).await;
        assert_eq!(
            ids(&engine.get_row_between(0, 10).await),
            vec!["K30", "K100"],
            "{:?}",
            kind
        );

        engine.insert_row("id=K9,name=a,age=9").await.unwrap();
        engine.insert_row("id=K1000,name=d,age=1000").await.unwrap();
        if kind == CacheKind::TombstoneSlice {
            engine.compact().await;
        }

        assert_eq!(
            ids(&engine.get_row_between(0, 10).await),
            vec!["K9", "K30", "K100", "K1000"],
            "{:?}",
            kind
        );
        assert_eq!(ids(&engine.get_one_page_rows(1, 1).await), vec!["K9"], "{:?}", kind);
    }
}

#[tokio::test]
async fn test_non_finite_number_is_stored_as_text() {
    let store = people_store();
    let engine = load(&store, people_table(Some(CacheKind::SortedSlice), Some("order by age"))).await;

    engine.insert_row("id=K3,name=x,age=inf").await.unwrap();

    assert_eq!(engine.get_column("K3", "age").await.unwrap(), "inf");
    assert_eq!(store_count(&store, "age = 'inf'").await, 1);
    // Keys that are not finite numbers sort ahead of numbers
    assert_eq!(ids(&engine.get_row_between(0, 10).await), vec!["K3", "K2", "K1"]);
}

#[tokio::test]
async fn test_tombstone_delete_keeps_raw_length() {
    let store = people_store();
    let engine = load(&store, people_table(Some(CacheKind::TombstoneSlice), Some("order by age"))).await;

    engine.del_row("K2").await.unwrap();

    let stats = engine.stats().await;
    assert_eq!(stats.ordered_len, 1);
    assert_eq!(stats.ordered_raw_len, 2);
    assert_eq!(stats.tombstones, 1);
    assert_eq!(engine.get_page_count(1).await, 1);
    assert_eq!(ids(&engine.get_row_between(0, 10).await), vec!["K1"]);

    assert_eq!(engine.compact().await, 1);
    let stats = engine.stats().await;
    assert_eq!(stats.ordered_raw_len, 1);
    assert_eq!(stats.tombstones, 0);
}

#[tokio::test]
async fn test_ordered_length_tracks_index_for_every_kind() {
    for kind in [CacheKind::SortedSlice, CacheKind::TombstoneSlice, CacheKind::LinkedList] {
        let store = people_store();
        let engine = load(&store, people_table(Some(kind), Some("order by age"))).await;

        engine.insert_row("id=K3,name=kit,age=25").await.unwrap();
        engine.insert_row("id=K4,name=kaz,age=40").await.unwrap();
        engine.del_row("K1").await.unwrap();
        engine.update_columns("K3", "age=50,name=kitt").await.unwrap();

        let stats = engine.stats().await;
        assert_eq!(stats.rows, 3, "{:?}", kind);
        assert_eq!(stats.ordered_len, stats.rows, "{:?}", kind);
        if kind == CacheKind::TombstoneSlice {
            assert_eq!(stats.tombstones, 2);
            engine.compact().await;
        }

        let all = engine.get_row_between(0, 10).await;
        assert_eq!(ids(&all), vec!["K2", "K4", "K3"], "{:?}", kind);
    }
}

// == Predicates ==

#[tokio::test]
async fn test_where_and_or_semantics() {
    let store = people_store();
    let engine = load(&store, people_table(None, None)).await;

    let both = engine.get_where("name=kim and age=30").await.unwrap();
    assert_eq!(ids(&both), vec!["K1"]);

    let neither = engine.get_where("name=kim and age=20").await.unwrap();
    assert!(neither.is_empty());

    let mut either = engine.get_where("name=kim OR age=20").await.unwrap();
    either.sort_by(|a, b| a["id"].cmp(&b["id"]));
    assert_eq!(ids(&either), vec!["K1", "K2"]);

    let not_kim = engine.get_where("name!=kim").await.unwrap();
    assert_eq!(ids(&not_kim), vec!["K2"]);

    assert!(matches!(
        engine.get_where("").await,
        Err(CacheError::PredicateSyntax(_))
    ));
}

#[tokio::test]
async fn test_unordered_table_has_no_pages() {
    let store = people_store();
    let engine = load(&store, people_table(None, None)).await;

    assert_eq!(engine.get_page_count(10).await, 0);
    assert!(engine.get_one_page_rows(1, 10).await.is_empty());
    assert_eq!(engine.len(), 2);
}

// == Pagination ==

#[tokio::test]
async fn test_page_clamping() {
    let store = people_store();
    for (id, age) in [("K3", 31), ("K4", 32), ("K5", 33)] {
        store
            .execute(&format!("INSERT INTO people VALUES ('{}', 'x', {})", id, age))
            .await
            .unwrap();
    }
    let engine = load(&store, people_table(Some(CacheKind::SortedSlice), Some("order by age"))).await;

    assert_eq!(engine.get_page_count(2).await, 3);
    assert_eq!(engine.get_page_count(0).await, 0);

    assert_eq!(ids(&engine.get_one_page_rows(0, 2).await), vec!["K2", "K1"]);
    assert_eq!(ids(&engine.get_one_page_rows(3, 2).await), vec!["K5"]);
    assert_eq!(ids(&engine.get_one_page_rows(99, 2).await), vec!["K5"]);
    assert!(engine.get_one_page_rows(1, 0).await.is_empty());

    let two = engine.get_multipage_rows(2, 2, 2).await;
    assert_eq!(ids(&two), vec!["K3", "K4", "K5"]);
    assert_eq!(engine.get_multipage_rows(1, usize::MAX, 2).await.len(), 5);
}

// == Write Paths ==

#[tokio::test]
async fn test_realtime_failure_leaves_cache_unchanged() {
    let store = people_store();
    let engine = load(&store, people_table(Some(CacheKind::SortedSlice), Some("order by age"))).await;

    store.execute_batch("DROP TABLE people").unwrap();

    assert!(matches!(
        engine.del_row("K1").await,
        Err(CacheError::SynchronousWrite(_))
    ));
    assert!(matches!(
        engine.update_column("K1", "name", "x").await,
        Err(CacheError::SynchronousWrite(_))
    ));
    assert_eq!(engine.get_row("K1").await.unwrap()["name"], "kim");
    assert_eq!(engine.stats().await.ordered_len, 2);
}

#[tokio::test]
async fn test_insert_rejects_duplicate_and_missing_pkey() {
    let store = people_store();
    let engine = load(&store, people_table(Some(CacheKind::SortedSlice), Some("order by age"))).await;

    assert!(matches!(
        engine.insert_row("id=K1,name=dup").await,
        Err(CacheError::Validation(_))
    ));
    assert!(matches!(
        engine.insert_row("name=nokey").await,
        Err(CacheError::Validation(_))
    ));
    assert!(matches!(
        engine.insert_row("id=K9,name=a,name=b").await,
        Err(CacheError::Validation(_))
    ));
    assert_eq!(store_count(&store, "1 = 1").await, 2);
}

#[tokio::test]
async fn test_queued_insert_is_journaled_then_applied() {
    let dir = TempDir::new().unwrap();
    let store = people_store();
    let mut table = people_table(Some(CacheKind::SortedSlice), Some("order by age"));
    table.is_realtime = false;
    let engine = CacheEngine::load(Arc::new(store.clone()), table, &queued_policy(&dir))
        .await
        .unwrap();

    let affected = engine.insert_row("id=K3,name=o'neil,age=5").await.unwrap();
    assert_eq!(affected, 0);
    assert_eq!(ids(&engine.get_one_page_rows(1, 1).await), vec!["K3"]);

    engine.close().await;

    let journal = std::fs::read_to_string(dir.path().join("people_async_sql.sql")).unwrap();
    assert!(journal.contains("INSERT INTO people"));
    assert!(journal.contains("'o''neil'"));
    assert_eq!(store_count(&store, "id = 'K3'").await, 1);
    assert_eq!(engine.stats().await.queue.executed_writes, 1);
}

#[tokio::test]
async fn test_wait_for_result_reports_store_outcome() {
    let dir = TempDir::new().unwrap();
    let store = people_store();
    let mut table = people_table(Some(CacheKind::LinkedList), Some("order by age"));
    table.is_realtime = false;
    table.wait_for_result = true;
    let engine = CacheEngine::load(Arc::new(store.clone()), table, &queued_policy(&dir))
        .await
        .unwrap();

    assert_eq!(engine.update_column("K2", "name", "kay").await.unwrap(), 1);
    assert_eq!(store_count(&store, "name = 'kay'").await, 1);

    store.execute_batch("DROP TABLE people").unwrap();
    assert!(matches!(
        engine.del_row("K1").await,
        Err(CacheError::QueuedWrite(_))
    ));
    assert!(engine.get_row("K1").await.is_ok());

    engine.close().await;
    let failed = std::fs::read_to_string(dir.path().join("people_async_sql_failed.sql")).unwrap();
    assert!(failed.contains("DELETE FROM people"));
}

#[tokio::test]
async fn test_auto_increment_uses_generated_key() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .execute_batch(
            "CREATE TABLE notes (id INTEGER PRIMARY KEY AUTOINCREMENT, body TEXT);
             INSERT INTO notes (body) VALUES ('first');",
        )
        .unwrap();
    let mut table = TableConfig::new("notes", "id", &["id", "body"]);
    table.pkey_auto_increment = true;
    table.is_realtime = true;
    let engine = load(&store, table).await;

    engine.insert_row("body=second").await.unwrap();

    let row = engine.get_row("2").await.unwrap();
    assert_eq!(row["body"], "second");
    assert_eq!(row["id"], "2");
}

#[tokio::test]
async fn test_null_values_become_sentinel() {
    let store = people_store();
    store
        .execute_batch("INSERT INTO people VALUES ('K3', 'nil', NULL)")
        .unwrap();
    let engine = load(&store, people_table(None, None)).await;

    assert_eq!(engine.get_column("K3", "age").await.unwrap(), "NULL");
    assert!(matches!(
        engine.get_column("K3", "email").await,
        Err(CacheError::NotFound(_))
    ));
}
