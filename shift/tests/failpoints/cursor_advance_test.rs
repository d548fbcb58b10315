use shift::engine::{WriteMode, shift_table};
use shift::error::ErrorKind;
use shift::schema::TableDescriptor;
use shift::store::progress::ProgressStore;
use shift::store::progress::memory::MemoryProgressStore;
use shift::test_utils::failpoints::ArmedFailPoint;
use shift::test_utils::memory_source::MemorySource;
use shift::test_utils::memory_target::MemoryTarget;
use shift::types::Cell;
use telemetry::tracing::init_test_tracing;

async fn setup(primary_key: Option<&str>) -> (MemorySource, MemoryTarget, MemoryProgressStore) {
    let source = MemorySource::new();
    source
        .insert_table(
            "events",
            &["id", "kind"],
            (1..=3)
                .map(|id| vec![Cell::I64(id), Cell::String(format!("kind {id}"))])
                .collect(),
        )
        .await;

    let target = MemoryTarget::new();
    target
        .create_table("events", &["id", "kind"], primary_key)
        .await;

    let store = MemoryProgressStore::new();
    store.ensure(&["events".to_string()], false).await.unwrap();

    (source, target, store)
}

fn descriptors(primary_key: Option<&str>) -> (TableDescriptor, TableDescriptor) {
    let source_table = TableDescriptor::new("events", ["id", "kind"]).with_read_limit(10);
    let mut target_table = TableDescriptor::new("events", ["id", "kind"]);
    if let Some(primary_key) = primary_key {
        target_table = target_table.with_primary_key(primary_key);
    }

    (source_table, target_table)
}

#[tokio::test]
async fn append_replays_the_page_written_before_the_failure() {
    init_test_tracing();
    let (source, target, store) = setup(None).await;
    let (source_table, target_table) = descriptors(None);

    let fail_point = ArmedFailPoint::before_cursor_advance();
    let err = shift_table(
        &source,
        &target,
        &store,
        &source_table,
        &target_table,
        WriteMode::Append,
    )
    .await
    .unwrap_err();
    fail_point.disarm();

    assert_eq!(err.kind(), ErrorKind::FailpointTriggered);
    assert_eq!(target.table_rows("events").await.len(), 3);
    assert_eq!(store.get("events").await.unwrap(), 0);

    shift_table(
        &source,
        &target,
        &store,
        &source_table,
        &target_table,
        WriteMode::Append,
    )
    .await
    .unwrap();

    // The page is loaded again because the offset never moved.
    assert_eq!(target.table_rows("events").await.len(), 6);
    assert_eq!(store.get("events").await.unwrap(), 3);
}

#[tokio::test]
async fn merge_replays_the_page_without_changes() {
    init_test_tracing();
    let (source, target, store) = setup(Some("id")).await;
    let (source_table, target_table) = descriptors(Some("id"));

    let fail_point = ArmedFailPoint::before_cursor_advance();
    let err = shift_table(
        &source,
        &target,
        &store,
        &source_table,
        &target_table,
        WriteMode::Merge,
    )
    .await
    .unwrap_err();
    fail_point.disarm();

    assert_eq!(err.kind(), ErrorKind::FailpointTriggered);
    let rows_after_failure = target.table_rows("events").await;
    let changes_after_failure = target.changed_rows().await;
    assert_eq!(changes_after_failure, 3);

    let report = shift_table(
        &source,
        &target,
        &store,
        &source_table,
        &target_table,
        WriteMode::Merge,
    )
    .await
    .unwrap();

    assert_eq!(report.rows, 3);
    assert_eq!(target.table_rows("events").await, rows_after_failure);
    assert_eq!(target.changed_rows().await, changes_after_failure);
    assert_eq!(store.get("events").await.unwrap(), 3);
}
