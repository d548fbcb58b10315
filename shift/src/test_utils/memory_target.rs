use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::bail;
use crate::error::{ErrorKind, ShiftResult};
use crate::target::Target;
use crate::types::{Cell, TableRow};

#[derive(Debug, Clone)]
struct MemoryTable {
    columns: Vec<String>,
    primary_key: Option<usize>,
    rows: Vec<TableRow>,
}

impl MemoryTable {
    fn column_positions(&self, table: &str, columns: &[String]) -> ShiftResult<Vec<usize>> {
        columns
            .iter()
            .map(|column| match self.columns.iter().position(|name| name == column) {
                Some(position) => Ok(position),
                None => bail!(
                    ErrorKind::SchemaError,
                    "Memory target column does not exist",
                    format!("column `{column}` of `{table}`")
                ),
            })
            .collect()
    }

    fn find_by_key(&self, key: &Cell) -> Option<usize> {
        let primary_key = self.primary_key?;
        self.rows
            .iter()
            .position(|row| &row.values[primary_key] == key)
    }
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, MemoryTable>,
    statements: Vec<String>,
    changed_rows: u64,
}

/// In-memory [`Target`] with just enough Postgres semantics to test the engine.
///
/// Bulk loads append rows and respect the primary key. [`Target::execute`] understands the
/// upserts generated by [`crate::sql::build_upsert`], including the `IS DISTINCT FROM` guard:
/// a conflicting row is only rewritten, and counted as changed, when its values differ.
#[derive(Debug, Clone, Default)]
pub struct MemoryTarget {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table, replacing any table with the same name.
    pub async fn create_table(&self, name: &str, columns: &[&str], primary_key: Option<&str>) {
        let columns = columns
            .iter()
            .map(|column| column.to_string())
            .collect::<Vec<_>>();
        let primary_key =
            primary_key.and_then(|key| columns.iter().position(|column| column == key));

        let mut inner = self.inner.lock().await;
        inner.tables.insert(
            name.to_string(),
            MemoryTable {
                columns,
                primary_key,
                rows: Vec::new(),
            },
        );
    }

    /// Returns the rows of `table` in insertion order, or nothing if it does not exist.
    pub async fn table_rows(&self, table: &str) -> Vec<TableRow> {
        let inner = self.inner.lock().await;
        inner
            .tables
            .get(table)
            .map(|table| table.rows.clone())
            .unwrap_or_default()
    }

    /// Returns how many rows were inserted or updated since creation.
    pub async fn changed_rows(&self) -> u64 {
        self.inner.lock().await.changed_rows
    }

    /// Returns every statement passed to [`Target::execute`].
    pub async fn statements(&self) -> Vec<String> {
        self.inner.lock().await.statements.clone()
    }
}

/// The parts of a generated upsert the memory target cares about.
struct ParsedUpsert<'a> {
    table: &'a str,
    columns: Vec<String>,
    do_nothing: bool,
}

fn parse_upsert(statement: &str) -> Option<ParsedUpsert<'_>> {
    let rest = statement.strip_prefix("INSERT INTO ")?;
    let table = rest.split_whitespace().next()?;

    let (_, rest) = rest.split_once('(')?;
    let (columns, rest) = rest.split_once(')')?;
    let (_, conflict_action) = rest.split_once(" ON CONFLICT ")?;

    Some(ParsedUpsert {
        table,
        columns: columns.split(", ").map(str::to_string).collect(),
        do_nothing: conflict_action.contains("DO NOTHING"),
    })
}

impl Target for MemoryTarget {
    async fn bulk_load(
        &self,
        table: &str,
        columns: &[String],
        rows: Vec<TableRow>,
    ) -> ShiftResult<u64> {
        let mut inner = self.inner.lock().await;
        let Some(memory_table) = inner.tables.get_mut(table) else {
            bail!(
                ErrorKind::SchemaError,
                "Memory target table does not exist",
                table
            );
        };

        let positions = memory_table.column_positions(table, columns)?;
        let width = memory_table.columns.len();

        let mut loaded = Vec::with_capacity(rows.len());
        for row in rows {
            let mut full_row = TableRow::nulls(width);
            for (position, value) in positions.iter().zip(row.values) {
                full_row.values[*position] = value;
            }

            if let Some(primary_key) = memory_table.primary_key {
                let key = &full_row.values[primary_key];
                let duplicated = memory_table.find_by_key(key).is_some()
                    || loaded
                        .iter()
                        .any(|row: &TableRow| &row.values[primary_key] == key);
                if duplicated {
                    bail!(
                        ErrorKind::ConstraintViolation,
                        "Memory target primary key violation",
                        format!("duplicated key {key:?} in `{table}`")
                    );
                }
            }

            loaded.push(full_row);
        }

        let count = loaded.len() as u64;
        memory_table.rows.extend(loaded);
        inner.changed_rows += count;

        Ok(count)
    }

    async fn execute(&self, statement: &str, params: &[&Cell]) -> ShiftResult<u64> {
        let mut inner = self.inner.lock().await;
        inner.statements.push(statement.to_string());

        let Some(upsert) = parse_upsert(statement) else {
            bail!(
                ErrorKind::QueryFailed,
                "Memory target can't parse the statement",
                statement
            );
        };

        let Some(memory_table) = inner.tables.get_mut(upsert.table) else {
            bail!(
                ErrorKind::SchemaError,
                "Memory target table does not exist",
                upsert.table
            );
        };
        let Some(primary_key) = memory_table.primary_key else {
            bail!(
                ErrorKind::SchemaError,
                "Memory target table has no primary key to resolve conflicts on",
                upsert.table
            );
        };

        let positions = memory_table.column_positions(upsert.table, &upsert.columns)?;
        if params.len() % positions.len() != 0 {
            bail!(
                ErrorKind::QueryFailed,
                "Parameter count is not a multiple of the column count",
                format!("{} parameters for {} columns", params.len(), positions.len())
            );
        }

        let width = memory_table.columns.len();
        let mut affected = 0;
        for chunk in params.chunks(positions.len()) {
            let mut incoming = TableRow::nulls(width);
            for (position, value) in positions.iter().zip(chunk) {
                incoming.values[*position] = (*value).clone();
            }

            let Some(existing) = memory_table.find_by_key(&incoming.values[primary_key]) else {
                memory_table.rows.push(incoming);
                affected += 1;
                continue;
            };

            if upsert.do_nothing {
                continue;
            }

            let mut updated = memory_table.rows[existing].clone();
            for position in positions.iter().filter(|position| **position != primary_key) {
                updated.values[*position] = incoming.values[*position].clone();
            }

            if updated != memory_table.rows[existing] {
                memory_table.rows[existing] = updated;
                affected += 1;
            }
        }

        inner.changed_rows += affected;

        Ok(affected)
    }
}
