use crate::types::Cell;

/// A row aligned to a table's declared column order.
///
/// `values[i]` belongs to the table's `i`-th column. Columns the source did not provide hold
/// [`Cell::Null`], so a row is never shorter than the table it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub values: Vec<Cell>,
}

impl TableRow {
    pub fn new(values: Vec<Cell>) -> Self {
        Self { values }
    }

    /// Returns a row of `width` nulls.
    pub fn nulls(width: usize) -> Self {
        Self {
            values: vec![Cell::Null; width],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
