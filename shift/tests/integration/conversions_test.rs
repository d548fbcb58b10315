use shift::engine::WriteMode;
use shift::test_utils::database::TestDatabase;
use telemetry::tracing::init_test_tracing;

use crate::common::{pg_pipeline, shift_config, table};

const COLUMNS: &[&str] = &[
    "id", "flag", "small", "big", "ratio", "amount", "born_on", "seen_at", "tag", "payload",
    "scores", "wait", "raw", "feeling", "share",
];

const CREATE_TYPES: &str = "
    create type mood as enum ('sad', 'ok', 'happy');
    create domain percent as integer check (value between 0 and 100);
";

const CREATE_TABLE: &str = "
    id integer primary key,
    flag boolean,
    small smallint,
    big bigint,
    ratio real,
    amount numeric(12, 4),
    born_on date,
    seen_at timestamptz,
    tag uuid,
    payload jsonb,
    scores integer[],
    wait interval,
    raw bytea,
    feeling mood,
    share percent
";

const SELECT_AS_TEXT: &str = "
    select id::text, flag::text, small::text, big::text, ratio::text, amount::text,
        born_on::text, seen_at::text, tag::text, payload::text, scores::text, wait::text,
        raw::text, feeling::text, share::text
    from values_copy order by id
";

async fn value_databases() -> (TestDatabase, TestDatabase) {
    let source = TestDatabase::spawn().await;
    source.run_sql(CREATE_TYPES).await;
    source
        .run_sql(&format!("create table all_values ({CREATE_TABLE})"))
        .await;
    source
        .run_sql(
            "insert into all_values values
                (1, true, 7, 9000000000, 1.5, 12345.6789, '2020-02-29',
                 '2024-01-01 10:00:00+00', 'a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11',
                 '{\"a\": [1, 2]}', '{1,NULL,3}', '1 day 02:00:00', '\\xdeadbeef', 'happy', 42),
                (2, null, null, null, null, null, null, null, null, null, null, null, null,
                 null, null)",
        )
        .await;

    let target = TestDatabase::spawn().await;
    // Pushes the target's user-defined types to other OIDs than the source's.
    target
        .run_sql("create type unused as enum ('x'); create domain unused_too as text")
        .await;
    target.run_sql(CREATE_TYPES).await;
    target
        .run_sql(&format!("create table values_copy ({CREATE_TABLE})"))
        .await;

    (source, target)
}

fn values_config(source: &TestDatabase, target: &TestDatabase) -> config::shared::ShiftConfig {
    let mut values_copy = table("values_copy", COLUMNS, 10);
    values_copy.source_name = Some("all_values".to_string());
    values_copy.primary_key = Some("id".to_string());

    shift_config(
        source,
        vec![table("all_values", COLUMNS, 10)],
        target,
        vec![values_copy],
    )
}

async fn source_as_text(source: &TestDatabase) -> Vec<Vec<Option<String>>> {
    source
        .text_rows(&SELECT_AS_TEXT.replace("values_copy", "all_values"))
        .await
}

#[tokio::test(flavor = "multi_thread")]
async fn bulk_load_preserves_every_value() {
    init_test_tracing();
    let (source, target) = value_databases().await;
    let pipeline = pg_pipeline(values_config(&source, &target)).await;

    pipeline.run(WriteMode::Append).await.unwrap();

    assert_eq!(target.text_rows(SELECT_AS_TEXT).await, source_as_text(&source).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn upsert_preserves_every_value() {
    init_test_tracing();
    let (source, target) = value_databases().await;
    let pipeline = pg_pipeline(values_config(&source, &target)).await;

    pipeline.run(WriteMode::Merge).await.unwrap();
    // A replay goes through the distinct guard with the same payloads.
    pipeline.run(WriteMode::Merge).await.unwrap();

    assert_eq!(target.text_rows(SELECT_AS_TEXT).await, source_as_text(&source).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn integer_columns_fill_numeric_columns() {
    init_test_tracing();
    let source = TestDatabase::spawn().await;
    source
        .run_sql("create table amounts (id integer primary key, amount bigint)")
        .await;
    source
        .run_sql("insert into amounts values (1, 0), (2, -5), (3, 123450000), (4, null)")
        .await;
    let target = TestDatabase::spawn().await;
    target
        .run_sql("create table amounts (id integer primary key, amount numeric)")
        .await;

    let mut target_table = table("amounts", &["id", "amount"], 10);
    target_table.primary_key = Some("id".to_string());
    let config = shift_config(
        &source,
        vec![table("amounts", &["id", "amount"], 10)],
        &target,
        vec![target_table],
    );
    let pipeline = pg_pipeline(config).await;

    pipeline.run(WriteMode::Append).await.unwrap();
    pipeline.run(WriteMode::Merge).await.unwrap();

    assert_eq!(
        target
            .text_rows("select id::text, amount::text from amounts order by id")
            .await,
        vec![
            vec![Some("1".to_string()), Some("0".to_string())],
            vec![Some("2".to_string()), Some("-5".to_string())],
            vec![Some("3".to_string()), Some("123450000".to_string())],
            vec![Some("4".to_string()), None],
        ]
    );
}
