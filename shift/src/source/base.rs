use std::future::Future;

use crate::error::ShiftResult;
use crate::scan::RowCursor;

/// A system rows are read from.
///
/// The engine only ever runs select statements it generated itself and reads the result
/// through a [`RowCursor`]; no schema introspection beyond column names is needed.
pub trait Source {
    /// Cursor returned by [`Source::query`].
    type Cursor: RowCursor + Send;

    /// Runs `statement` and returns a cursor over its rows.
    fn query(&self, statement: &str) -> impl Future<Output = ShiftResult<Self::Cursor>> + Send;
}
