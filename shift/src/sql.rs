//! Statement generation for paginated reads and multi-row upserts.

use crate::bail;
use crate::error::{ErrorKind, ShiftResult};
use crate::schema::TableDescriptor;
use crate::types::{Cell, TableRow};

/// Maximum number of bind parameters Postgres accepts in a single statement.
///
/// Merge mode binds `read_limit × column count` parameters per page, so the page size of a
/// merged table is bounded by this value.
pub const MAX_STATEMENT_PARAMS: usize = u16::MAX as usize;

/// Alias given to the target table inside generated upserts.
const UPSERT_TABLE_ALIAS: &str = "_shift_t";

/// Builds the select reading one page of `table` starting at `offset`.
///
/// The filter, when present, is inserted verbatim between the table name and `LIMIT`.
pub fn build_select(table: &TableDescriptor, offset: u64) -> String {
    let columns = table.column_names().join(", ");

    let mut statement = format!("SELECT {columns} FROM {}", table.name);
    if let Some(filter) = table.filter.as_deref().map(str::trim)
        && !filter.is_empty()
    {
        statement.push(' ');
        statement.push_str(filter);
    }
    statement.push_str(&format!(" LIMIT {} OFFSET {offset}", table.read_limit));

    statement
}

/// A generated upsert together with the number of parameters it binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertStatement {
    pub sql: String,
    pub param_count: usize,
}

/// Builds an upsert of `row_count` rows into `table`.
///
/// Placeholders are numbered row-major from `$1`: the first row binds `$1..=$n` for `n`
/// columns, the second `$n+1..=$2n`, and so on. The primary key is never reassigned, and the
/// update only happens when the stored row differs from the incoming one. A table made only
/// of its primary key degrades to `DO NOTHING`.
pub fn build_upsert(table: &TableDescriptor, row_count: usize) -> ShiftResult<UpsertStatement> {
    let Some(primary_key) = table.primary_key.as_deref() else {
        bail!(
            ErrorKind::MissingPrimaryKey,
            "Merging requires a primary key",
            format!("target table `{}` has no primary key", table.name)
        );
    };

    if table.column_index(primary_key).is_none() {
        bail!(
            ErrorKind::StatementBuildFailed,
            "Primary key is not a column of the table",
            format!(
                "primary key `{primary_key}` is not a column of `{}`",
                table.name
            )
        );
    }

    let column_count = table.column_count();
    if row_count == 0 || column_count == 0 {
        bail!(
            ErrorKind::StatementBuildFailed,
            "An upsert needs at least one row and one column",
            format!(
                "table `{}` with {row_count} rows and {column_count} columns",
                table.name
            )
        );
    }

    let param_count = row_count * column_count;
    if param_count > MAX_STATEMENT_PARAMS {
        bail!(
            ErrorKind::StatementBuildFailed,
            "Upsert exceeds the bind parameter limit",
            format!(
                "{row_count} rows of {column_count} columns need {param_count} parameters, at most {MAX_STATEMENT_PARAMS} are allowed"
            )
        );
    }

    let columns = table.column_names().join(", ");
    let rows = (0..row_count)
        .map(|row| {
            let placeholders = (1..=column_count)
                .map(|column| format!("${}", row * column_count + column))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({placeholders})")
        })
        .collect::<Vec<_>>()
        .join(", ");

    let assignments = table
        .columns
        .iter()
        .filter(|column| column.name != primary_key)
        .map(|column| format!("{0} = EXCLUDED.{0}", column.name))
        .collect::<Vec<_>>();

    let conflict_action = if assignments.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!(
            "DO UPDATE SET {} WHERE {UPSERT_TABLE_ALIAS} IS DISTINCT FROM EXCLUDED",
            assignments.join(", ")
        )
    };

    let sql = format!(
        "INSERT INTO {} AS {UPSERT_TABLE_ALIAS} ({columns}) VALUES {rows} ON CONFLICT ({primary_key}) {conflict_action}",
        table.name
    );

    Ok(UpsertStatement { sql, param_count })
}

/// Flattens `rows` row-major into the parameter order used by [`build_upsert`].
///
/// Every row must have exactly `column_count` values.
pub fn flatten_params(rows: &[TableRow], column_count: usize) -> ShiftResult<Vec<&Cell>> {
    let mut params = Vec::with_capacity(rows.len() * column_count);

    for (index, row) in rows.iter().enumerate() {
        if row.len() != column_count {
            bail!(
                ErrorKind::StatementBuildFailed,
                "Row width does not match the column count",
                format!(
                    "row {index} has {} values, expected {column_count}",
                    row.len()
                )
            );
        }

        params.extend(row.values.iter());
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    fn abc() -> TableDescriptor {
        TableDescriptor::new("t", ["a", "b", "c"]).with_read_limit(10)
    }

    #[test]
    fn select_without_filter() {
        assert_eq!(build_select(&abc(), 5), "SELECT a, b, c FROM t LIMIT 10 OFFSET 5");
    }

    #[test]
    fn select_with_filter() {
        let table = abc().with_filter("WHERE x>1");

        assert_eq!(
            build_select(&table, 5),
            "SELECT a, b, c FROM t WHERE x>1 LIMIT 10 OFFSET 5"
        );
    }

    #[test]
    fn blank_filter_is_omitted() {
        let table = abc().with_filter("   ");

        assert_eq!(build_select(&table, 0), "SELECT a, b, c FROM t LIMIT 10 OFFSET 0");
    }

    #[test]
    fn upsert_of_three_rows() {
        let table = TableDescriptor::new("t", ["id", "b", "c"]).with_primary_key("id");

        let statement = build_upsert(&table, 3).unwrap();

        assert_eq!(statement.param_count, 9);
        assert_snapshot!(statement.sql, @"INSERT INTO t AS _shift_t (id, b, c) VALUES ($1, $2, $3), ($4, $5, $6), ($7, $8, $9) ON CONFLICT (id) DO UPDATE SET b = EXCLUDED.b, c = EXCLUDED.c WHERE _shift_t IS DISTINCT FROM EXCLUDED");
    }

    #[test]
    fn upsert_never_reassigns_the_primary_key() {
        let table = TableDescriptor::new("t", ["a", "id", "b"]).with_primary_key("id");

        let statement = build_upsert(&table, 1).unwrap();

        assert!(statement.sql.contains("SET a = EXCLUDED.a, b = EXCLUDED.b WHERE"));
        assert!(!statement.sql.contains("id = EXCLUDED.id"));
    }

    #[test]
    fn upsert_of_key_only_table_does_nothing_on_conflict() {
        let table = TableDescriptor::new("tags", ["tag"]).with_primary_key("tag");

        let statement = build_upsert(&table, 2).unwrap();

        assert_snapshot!(statement.sql, @"INSERT INTO tags AS _shift_t (tag) VALUES ($1), ($2) ON CONFLICT (tag) DO NOTHING");
    }

    #[test]
    fn upsert_requires_a_primary_key() {
        let err = build_upsert(&abc(), 1).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingPrimaryKey);
    }

    #[test]
    fn upsert_rejects_empty_pages_and_oversized_statements() {
        let table = abc().with_primary_key("a");

        assert_eq!(
            build_upsert(&table, 0).unwrap_err().kind(),
            ErrorKind::StatementBuildFailed
        );
        assert_eq!(
            build_upsert(&table, MAX_STATEMENT_PARAMS / 3 + 1)
                .unwrap_err()
                .kind(),
            ErrorKind::StatementBuildFailed
        );
        assert!(build_upsert(&table, MAX_STATEMENT_PARAMS / 3).is_ok());
    }

    #[test]
    fn params_are_flattened_row_major() {
        let rows = vec![
            TableRow::new(vec![Cell::I32(1), Cell::String("a".to_string())]),
            TableRow::new(vec![Cell::I32(2), Cell::Null]),
        ];

        let params = flatten_params(&rows, 2).unwrap();

        assert_eq!(
            params,
            vec![
                &Cell::I32(1),
                &Cell::String("a".to_string()),
                &Cell::I32(2),
                &Cell::Null
            ]
        );
    }

    #[test]
    fn ragged_rows_are_a_build_error() {
        let rows = vec![TableRow::new(vec![Cell::I32(1)])];

        let err = flatten_params(&rows, 2).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StatementBuildFailed);
    }
}
