use config::shared::{DatabaseConfig, IntoConnectOptions};
use postgres::progress::{ensure_progress_rows, get_progress_offset, update_progress_offset};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::info;

use crate::bail;
use crate::error::{ErrorKind, ShiftResult};
use crate::store::progress::ProgressStore;

const NUM_POOL_CONNECTIONS: u32 = 1;

/// A [`ProgressStore`] keeping offsets in the `_shift_state` table of a Postgres database,
/// normally the target of the shift.
#[derive(Debug, Clone)]
pub struct PostgresProgressStore {
    pool: PgPool,
}

impl PostgresProgressStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database described by `config`.
    pub async fn connect(config: &DatabaseConfig) -> ShiftResult<Self> {
        let options: PgConnectOptions = config.connect_options()?;

        let pool = PgPoolOptions::new()
            .max_connections(NUM_POOL_CONNECTIONS)
            .min_connections(NUM_POOL_CONNECTIONS)
            .connect_with(options)
            .await?;

        Ok(Self::new(pool))
    }
}

impl ProgressStore for PostgresProgressStore {
    async fn ensure(&self, table_names: &[String], reset: bool) -> ShiftResult<()> {
        ensure_progress_rows(&self.pool, table_names, reset).await?;

        info!(table_count = table_names.len(), reset, "progress rows ensured");

        Ok(())
    }

    async fn get(&self, table_name: &str) -> ShiftResult<u64> {
        let Some(offset) = get_progress_offset(&self.pool, table_name).await? else {
            bail!(
                ErrorKind::ProgressNotFound,
                "No progress recorded for table",
                format!("table `{table_name}` has no row in _shift_state")
            );
        };

        Ok(u64::try_from(offset)?)
    }

    async fn set(&self, table_name: &str, offset: u64) -> ShiftResult<()> {
        let updated = update_progress_offset(&self.pool, table_name, i64::try_from(offset)?).await?;

        if updated == 0 {
            bail!(
                ErrorKind::ProgressNotFound,
                "No progress recorded for table",
                format!("table `{table_name}` has no row in _shift_state")
            );
        }

        Ok(())
    }
}
