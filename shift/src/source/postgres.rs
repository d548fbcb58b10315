use std::collections::VecDeque;
use std::sync::Arc;

use config::shared::DatabaseConfig;
use tokio_postgres::{Client, Row};
use tracing::debug;

use crate::bail;
use crate::client::connect;
use crate::conversions::row::decode_row;
use crate::error::{ErrorKind, ShiftResult};
use crate::scan::RowCursor;
use crate::source::Source;
use crate::types::Cell;

/// A [`Source`] reading from Postgres.
#[derive(Clone)]
pub struct PgSource {
    client: Arc<Client>,
}

impl PgSource {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Connects to the database described by `config`.
    pub async fn connect(config: &DatabaseConfig) -> ShiftResult<Self> {
        let client = connect(config).await?;

        Ok(Self::new(client))
    }
}

impl Source for PgSource {
    type Cursor = PgRowCursor;

    async fn query(&self, statement: &str) -> ShiftResult<PgRowCursor> {
        let prepared = self.client.prepare(statement).await?;
        let rows = self.client.query(&prepared, &[]).await?;
        debug!(row_count = rows.len(), "source query returned");

        let columns = prepared
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();

        Ok(PgRowCursor {
            columns,
            rows: rows.into(),
        })
    }
}

/// Cursor over the rows of a Postgres query, decoding values as they are fetched.
pub struct PgRowCursor {
    columns: Vec<String>,
    rows: VecDeque<Row>,
}

impl RowCursor for PgRowCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn has_next(&self) -> bool {
        !self.rows.is_empty()
    }

    fn fetch(&mut self) -> ShiftResult<Vec<Cell>> {
        let Some(row) = self.rows.pop_front() else {
            bail!(ErrorKind::InvalidState, "Fetched past the end of the cursor");
        };

        decode_row(&row)
    }
}
