//! Aligns source rows to the target table's column order.

use std::collections::HashMap;

use crate::bail;
use crate::error::{ErrorKind, ShiftResult};
use crate::schema::TableDescriptor;
use crate::types::{Cell, TableRow};

/// A forward-only cursor over the rows of a result set.
pub trait RowCursor {
    /// Names of the result set columns, in result set order.
    fn columns(&self) -> &[String];

    /// Returns `true` while [`RowCursor::fetch`] has rows left to return.
    fn has_next(&self) -> bool;

    /// Returns the next row, one value per entry of [`RowCursor::columns`].
    fn fetch(&mut self) -> ShiftResult<Vec<Cell>>;
}

/// Maps column names to positions in a target table.
///
/// Built once per target table and reused for every page.
#[derive(Debug, Clone)]
pub struct ColumnProjection {
    positions: HashMap<String, usize>,
    width: usize,
}

impl ColumnProjection {
    pub fn new(target: &TableDescriptor) -> Self {
        let positions = target
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| (column.name.clone(), index))
            .collect();

        Self {
            positions,
            width: target.column_count(),
        }
    }

    /// Number of columns of the target table.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Resolves, for every result set column, the target position it feeds. Columns the
    /// target does not declare map to [`None`].
    fn resolve(&self, source_columns: &[String]) -> Vec<Option<usize>> {
        source_columns
            .iter()
            .map(|name| self.positions.get(name).copied())
            .collect()
    }
}

/// Reads every row of `cursor` and projects it onto the target columns of `projection`.
///
/// Values are matched by column name. Source columns the target does not declare are
/// dropped, and target columns the source does not provide, or provides as null, are
/// [`Cell::Null`]. When the result set repeats a column name, the last non-null value wins.
pub fn scan<C>(cursor: &mut C, projection: &ColumnProjection) -> ShiftResult<Vec<TableRow>>
where
    C: RowCursor + ?Sized,
{
    let positions = projection.resolve(cursor.columns());
    let mut rows = Vec::new();

    while cursor.has_next() {
        let values = cursor.fetch()?;
        if values.len() != positions.len() {
            bail!(
                ErrorKind::InvalidData,
                "Row width does not match the result set",
                format!(
                    "row {} has {} values for {} columns",
                    rows.len(),
                    values.len(),
                    positions.len()
                )
            );
        }

        let mut row = TableRow::nulls(projection.width());
        for (position, value) in positions.iter().zip(values) {
            if let Some(position) = position
                && !value.is_null()
            {
                row.values[*position] = value;
            }
        }

        rows.push(row);
    }

    Ok(rows)
}
