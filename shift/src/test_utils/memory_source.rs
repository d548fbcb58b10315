use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::bail;
use crate::error::{ErrorKind, ShiftResult};
use crate::scan::RowCursor;
use crate::source::Source;
use crate::types::Cell;

#[derive(Debug, Clone)]
struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, MemoryTable>,
    queries: Vec<String>,
    fail_queries: bool,
}

/// In-memory [`Source`] understanding the selects generated by [`crate::sql::build_select`].
///
/// The projection, table name, `LIMIT` and `OFFSET` are honored. Filters are ignored, but
/// every statement is recorded so tests can assert on it.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces `name` with the given columns and rows.
    pub async fn insert_table(&self, name: &str, columns: &[&str], rows: Vec<Vec<Cell>>) {
        let mut inner = self.inner.lock().await;
        inner.tables.insert(
            name.to_string(),
            MemoryTable {
                columns: columns.iter().map(|column| column.to_string()).collect(),
                rows,
            },
        );
    }

    /// Makes every following query fail until called again with `false`.
    pub async fn fail_queries(&self, fail: bool) {
        self.inner.lock().await.fail_queries = fail;
    }

    /// Returns every statement received so far.
    pub async fn queries(&self) -> Vec<String> {
        self.inner.lock().await.queries.clone()
    }
}

/// The parts of a generated select the memory source cares about.
struct ParsedSelect<'a> {
    columns: Vec<&'a str>,
    table: &'a str,
    limit: usize,
    offset: usize,
}

fn parse_select(statement: &str) -> Option<ParsedSelect<'_>> {
    let rest = statement.strip_prefix("SELECT ")?;
    let (columns, rest) = rest.split_once(" FROM ")?;
    let table = rest.split_whitespace().next()?;

    let (_, limit_and_offset) = rest.rsplit_once(" LIMIT ")?;
    let (limit, offset) = limit_and_offset.split_once(" OFFSET ")?;

    Some(ParsedSelect {
        columns: columns.split(", ").collect(),
        table,
        limit: limit.trim().parse().ok()?,
        offset: offset.trim().parse().ok()?,
    })
}

impl Source for MemorySource {
    type Cursor = MemoryRowCursor;

    async fn query(&self, statement: &str) -> ShiftResult<MemoryRowCursor> {
        let mut inner = self.inner.lock().await;
        inner.queries.push(statement.to_string());

        if inner.fail_queries {
            bail!(
                ErrorKind::QueryFailed,
                "Memory source query failed",
                "queries are configured to fail"
            );
        }

        let Some(select) = parse_select(statement) else {
            bail!(
                ErrorKind::QueryFailed,
                "Memory source can't parse the statement",
                statement
            );
        };

        let Some(table) = inner.tables.get(select.table) else {
            bail!(
                ErrorKind::SchemaError,
                "Memory source table does not exist",
                select.table
            );
        };

        let mut indexes = Vec::with_capacity(select.columns.len());
        for column in &select.columns {
            let Some(index) = table.columns.iter().position(|name| name.as_str() == *column) else {
                bail!(
                    ErrorKind::SchemaError,
                    "Memory source column does not exist",
                    format!("column `{column}` of `{}`", select.table)
                );
            };
            indexes.push(index);
        }

        let rows = table
            .rows
            .iter()
            .skip(select.offset)
            .take(select.limit)
            .map(|row| indexes.iter().map(|index| row[*index].clone()).collect::<Vec<_>>())
            .collect();

        Ok(MemoryRowCursor {
            columns: select.columns.iter().map(|column| column.to_string()).collect(),
            rows,
        })
    }
}

/// Cursor returned by [`MemorySource`].
#[derive(Debug, Clone)]
pub struct MemoryRowCursor {
    columns: Vec<String>,
    rows: VecDeque<Vec<Cell>>,
}

impl RowCursor for MemoryRowCursor {
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

        Ok(row)
    }
}
