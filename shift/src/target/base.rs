use std::future::Future;

use crate::error::ShiftResult;
use crate::types::{Cell, TableRow};

/// A system rows are written to.
pub trait Target {
    /// Loads `rows` into `table`. `rows` are aligned to `columns`.
    ///
    /// The load is atomic: either all rows are written or none are. Returns the number of
    /// rows written.
    fn bulk_load(
        &self,
        table: &str,
        columns: &[String],
        rows: Vec<TableRow>,
    ) -> impl Future<Output = ShiftResult<u64>> + Send;

    /// Executes `statement` with positional parameters and returns the number of rows it
    /// affected.
    fn execute(
        &self,
        statement: &str,
        params: &[&Cell],
    ) -> impl Future<Output = ShiftResult<u64>> + Send;
}
