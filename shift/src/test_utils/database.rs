use config::shared::DatabaseConfig;
use postgres::test_utils::{create_pg_database, drop_pg_database, random_database_config};
use sqlx::PgPool;
use tokio::runtime::Handle;

/// A database with a random name, dropped together with this value.
///
/// Dropping blocks on the cleanup, so tests using it must run on the multi threaded runtime.
pub struct TestDatabase {
    pub name: String,
    pub config: DatabaseConfig,
    pub pool: PgPool,
}

impl TestDatabase {
    /// Creates a fresh database on the test server.
    ///
    /// # Panics
    /// Panics if the database can't be created.
    pub async fn spawn() -> Self {
        let (name, config) = random_database_config();
        let pool = create_pg_database(&name, &config).await;

        Self { name, config, pool }
    }

    /// Executes `sql` and returns the number of affected rows.
    ///
    /// # Panics
    /// Panics if the statement fails.
    pub async fn run_sql(&self, sql: &str) -> u64 {
        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .unwrap_or_else(|err| panic!("failed to run `{sql}`: {err}"))
            .rows_affected()
    }

    /// Returns the rows selected by `sql`. Every selected column must be of type `text`.
    ///
    /// # Panics
    /// Panics if the query fails.
    pub async fn text_rows(&self, sql: &str) -> Vec<Vec<Option<String>>> {
        use sqlx::Row;

        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .unwrap_or_else(|err| panic!("failed to run `{sql}`: {err}"));

        rows.iter()
            .map(|row| {
                (0..row.len())
                    .map(|index| row.get::<Option<String>, _>(index))
                    .collect()
            })
            .collect()
    }
}

impl Drop for TestDatabase {
    fn drop(&mut self) {
        let name = self.name.clone();
        tokio::task::block_in_place(move || {
            Handle::current().block_on(async move { drop_pg_database(&name).await });
        });
    }
}

