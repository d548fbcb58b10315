use sqlx::{FromRow, PgExecutor, PgPool};
use tracing::debug;

/// Name of the table holding one progress row per shifted table.
pub const PROGRESS_TABLE_NAME: &str = "_shift_state";

/// A row of the progress table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ProgressRow {
    pub table_name: String,
    pub current_offset: i64,
}

/// Creates the progress table if it does not exist yet.
pub async fn create_progress_table<'c, E>(executor: E) -> sqlx::Result<()>
where
    E: PgExecutor<'c>,
{
    sqlx::query(
        r#"
        create table if not exists _shift_state (
            table_name text primary key,
            current_offset bigint not null default 0
        )
        "#,
    )
    .execute(executor)
    .await?;

    Ok(())
}

/// Creates the progress table and makes sure every name in `table_names` has a row.
///
/// Existing rows keep their offset unless `reset` is set, in which case the offsets of the
/// given tables, and only those, go back to zero. Everything happens in one transaction.
pub async fn ensure_progress_rows(
    pool: &PgPool,
    table_names: &[String],
    reset: bool,
) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;

    create_progress_table(&mut *tx).await?;

    sqlx::query(
        r#"
        insert into _shift_state (table_name)
        select unnest($1::text[])
        on conflict (table_name) do nothing
        "#,
    )
    .bind(table_names)
    .execute(&mut *tx)
    .await?;

    if reset {
        let reset_rows = sqlx::query(
            r#"
            update _shift_state
            set current_offset = 0
            where table_name = any($1)
            "#,
        )
        .bind(table_names)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        debug!(reset_rows, "reset progress offsets");
    }

    tx.commit().await?;

    Ok(())
}

/// Returns the stored offset of `table_name`, or [`None`] if the table has no row.
pub async fn get_progress_offset(pool: &PgPool, table_name: &str) -> sqlx::Result<Option<i64>> {
    sqlx::query_scalar(
        r#"
        select current_offset from _shift_state
        where table_name = $1
        "#,
    )
    .bind(table_name)
    .fetch_optional(pool)
    .await
}

/// Stores `offset` for `table_name` and returns the number of updated rows.
pub async fn update_progress_offset(
    pool: &PgPool,
    table_name: &str,
    offset: i64,
) -> sqlx::Result<u64> {
    let result = sqlx::query(
        r#"
        update _shift_state
        set current_offset = $2
        where table_name = $1
        "#,
    )
    .bind(table_name)
    .bind(offset)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Returns all progress rows ordered by table name.
pub async fn get_progress_rows(pool: &PgPool) -> sqlx::Result<Vec<ProgressRow>> {
    sqlx::query_as::<_, ProgressRow>(
        r#"
        select table_name, current_offset
        from _shift_state
        order by table_name
        "#,
    )
    .fetch_all(pool)
    .await
}
