use shift::engine::WriteMode;
use shift::error::ErrorKind;
use shift::test_utils::database::TestDatabase;
use telemetry::tracing::init_test_tracing;

use crate::common::{pg_pipeline, shift_config, table};

async fn person_databases(row_count: i32) -> (TestDatabase, TestDatabase) {
    let source = TestDatabase::spawn().await;
    source
        .run_sql(
            "create table person (id integer primary key, name text not null, nickname text)",
        )
        .await;
    source
        .run_sql(&format!(
            "insert into person (id, name) select i, 'person ' || i from generate_series(1, {row_count}) as i"
        ))
        .await;

    let target = TestDatabase::spawn().await;
    target
        .run_sql("create table person_copy (nickname text, name text, id integer primary key)")
        .await;

    (source, target)
}

fn person_tables(
    source: &TestDatabase,
    target: &TestDatabase,
    read_limit: usize,
) -> config::shared::ShiftConfig {
    let mut person_copy = table("person_copy", &["nickname", "name", "id"], read_limit);
    person_copy.source_name = Some("person".to_string());
    person_copy.primary_key = Some("id".to_string());

    shift_config(
        source,
        vec![table("person", &["id", "name", "nickname"], read_limit)],
        target,
        vec![person_copy],
    )
}

async fn stored_offset(target: &TestDatabase, table_name: &str) -> Option<String> {
    target
        .text_rows(&format!(
            "select current_offset::text from _shift_state where table_name = '{table_name}'"
        ))
        .await
        .into_iter()
        .next()
        .and_then(|row| row.into_iter().next().flatten())
}

#[tokio::test(flavor = "multi_thread")]
async fn append_shifts_every_row_and_resumes_from_the_stored_offset() {
    init_test_tracing();
    let (source, target) = person_databases(5).await;
    let pipeline = pg_pipeline(person_tables(&source, &target, 2)).await;

    let report = pipeline.run(WriteMode::Append).await.unwrap();

    assert_eq!(report.total_rows(), 5);
    assert_eq!(report.tables[0].pages, 3);
    assert_eq!(stored_offset(&target, "person_copy").await.as_deref(), Some("5"));

    source
        .run_sql("insert into person (id, name) select i, 'late ' || i from generate_series(6, 8) as i")
        .await;
    let report = pipeline.run(WriteMode::Append).await.unwrap();

    assert_eq!(report.total_rows(), 3);
    assert_eq!(
        target
            .text_rows("select id::text, name, nickname from person_copy order by id")
            .await,
        (1..=8)
            .map(|id| {
                let prefix = if id <= 5 { "person" } else { "late" };
                vec![Some(id.to_string()), Some(format!("{prefix} {id}")), None]
            })
            .collect::<Vec<_>>()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn merge_updates_changed_rows_and_leaves_the_others_untouched() {
    init_test_tracing();
    let (source, target) = person_databases(4).await;
    let pipeline = pg_pipeline(person_tables(&source, &target, 3)).await;
    pipeline.run(WriteMode::Append).await.unwrap();

    let versions_before = target
        .text_rows("select id::text, xmin::text from person_copy order by id")
        .await;

    source
        .run_sql("update person set nickname = 'two' where id = 2")
        .await;
    let report = pipeline.run(WriteMode::Merge).await.unwrap();

    assert_eq!(report.total_rows(), 4);
    assert_eq!(stored_offset(&target, "person_copy").await.as_deref(), Some("4"));
    assert_eq!(
        target
            .text_rows("select nickname from person_copy where id = 2")
            .await,
        vec![vec![Some("two".to_string())]]
    );

    // Only the updated row gets a new tuple version.
    let versions_after = target
        .text_rows("select id::text, xmin::text from person_copy order by id")
        .await;
    for (before, after) in versions_before.iter().zip(&versions_after) {
        if before[0].as_deref() == Some("2") {
            assert_ne!(before, after);
        } else {
            assert_eq!(before, after);
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn merge_inserts_rows_missing_from_the_target() {
    init_test_tracing();
    let (source, target) = person_databases(3).await;
    target
        .run_sql("insert into person_copy (id, name) values (2, 'stale')")
        .await;
    let pipeline = pg_pipeline(person_tables(&source, &target, 10)).await;

    pipeline.run(WriteMode::Merge).await.unwrap();

    assert_eq!(
        target
            .text_rows("select id::text, name from person_copy order by id")
            .await,
        vec![
            vec![Some("1".to_string()), Some("person 1".to_string())],
            vec![Some("2".to_string()), Some("person 2".to_string())],
            vec![Some("3".to_string()), Some("person 3".to_string())],
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn filters_are_applied_verbatim() {
    init_test_tracing();
    let (source, target) = person_databases(6).await;
    let mut config = person_tables(&source, &target, 10);
    config.source.tables[0].filter = Some("WHERE id % 2 = 0".to_string());
    let pipeline = pg_pipeline(config).await;

    pipeline.run(WriteMode::Append).await.unwrap();

    assert_eq!(
        target
            .text_rows("select id::text from person_copy order by id")
            .await,
        vec![
            vec![Some("2".to_string())],
            vec![Some("4".to_string())],
            vec![Some("6".to_string())],
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn merge_without_primary_key_fails_before_reading() {
    init_test_tracing();
    let (source, target) = person_databases(2).await;
    let mut config = person_tables(&source, &target, 10);
    config.target.tables[0].primary_key = None;
    let pipeline = pg_pipeline(config).await;

    let err = pipeline.run(WriteMode::Merge).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MissingPrimaryKey);
    assert!(
        target
            .text_rows("select id::text from person_copy")
            .await
            .is_empty()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn target_write_errors_keep_the_offset() {
    init_test_tracing();
    let (source, target) = person_databases(2).await;
    target.run_sql("drop table person_copy").await;
    let pipeline = pg_pipeline(person_tables(&source, &target, 10)).await;

    let err = pipeline.run(WriteMode::Append).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TargetWriteFailed);
    assert_eq!(stored_offset(&target, "person_copy").await.as_deref(), Some("0"));
}
