use std::collections::HashMap;
use std::pin::pin;
use std::sync::Arc;

use config::shared::DatabaseConfig;
use tokio::sync::Mutex;
use tokio_postgres::Client;
use tokio_postgres::binary_copy::BinaryCopyInWriter;
use tokio_postgres::types::{ToSql, Type};
use tracing::debug;

use crate::client::connect;
use crate::error::ShiftResult;
use crate::target::Target;
use crate::types::{Cell, TableRow};

/// A [`Target`] writing to Postgres.
///
/// Bulk loads use binary `COPY`. The column types a `COPY` needs are looked up once per table
/// and column list, then cached.
#[derive(Clone)]
pub struct PgTarget {
    client: Arc<Client>,
    column_types: Arc<Mutex<HashMap<String, Vec<Type>>>>,
}

impl PgTarget {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
            column_types: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Connects to the database described by `config`.
    pub async fn connect(config: &DatabaseConfig) -> ShiftResult<Self> {
        let client = connect(config).await?;

        Ok(Self::new(client))
    }

    async fn column_types(&self, table: &str, column_list: &str) -> ShiftResult<Vec<Type>> {
        let key = format!("{table} ({column_list})");

        let mut cache = self.column_types.lock().await;
        if let Some(types) = cache.get(&key) {
            return Ok(types.clone());
        }

        let statement = self
            .client
            .prepare(&format!("SELECT {column_list} FROM {table} LIMIT 0"))
            .await?;
        let types = statement
            .columns()
            .iter()
            .map(|column| column.type_().clone())
            .collect::<Vec<_>>();

        cache.insert(key, types.clone());

        Ok(types)
    }
}

impl Target for PgTarget {
    async fn bulk_load(
        &self,
        table: &str,
        columns: &[String],
        rows: Vec<TableRow>,
    ) -> ShiftResult<u64> {
        let column_list = columns.join(", ");
        let types = self.column_types(table, &column_list).await?;

        let sink = self
            .client
            .copy_in(&format!(
                "COPY {table} ({column_list}) FROM STDIN WITH (FORMAT binary)"
            ))
            .await?;
        let mut writer = pin!(BinaryCopyInWriter::new(sink, &types));

        for row in &rows {
            let values = row
                .values
                .iter()
                .map(|cell| cell as &(dyn ToSql + Sync))
                .collect::<Vec<_>>();
            writer.as_mut().write(&values).await?;
        }

        let written = writer.finish().await?;
        debug!(table, written, "bulk load finished");

        Ok(written)
    }

    async fn execute(&self, statement: &str, params: &[&Cell]) -> ShiftResult<u64> {
        let params = params
            .iter()
            .map(|cell| *cell as &(dyn ToSql + Sync))
            .collect::<Vec<_>>();

        let affected = self.client.execute(statement, &params).await?;

        Ok(affected)
    }
}
