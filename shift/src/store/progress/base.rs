use std::future::Future;

use crate::error::ShiftResult;

/// Durable record of how many rows of each table have been shifted.
///
/// An offset is a plain row count keyed by table name. Implementations only need to behave
/// like a small key-value store; the engine guarantees that one table's offset has a single
/// writer at a time.
pub trait ProgressStore {
    /// Makes sure every name in `table_names` has an offset, creating missing ones at zero.
    ///
    /// Existing offsets are kept unless `reset` is set, in which case the offsets of
    /// `table_names` go back to zero. Offsets of other tables are never touched. Must be safe
    /// to call on every run.
    fn ensure(
        &self,
        table_names: &[String],
        reset: bool,
    ) -> impl Future<Output = ShiftResult<()>> + Send;

    /// Returns the offset of `table_name`.
    ///
    /// Fails with [`crate::error::ErrorKind::ProgressNotFound`] if the table was never passed
    /// to [`ProgressStore::ensure`].
    fn get(&self, table_name: &str) -> impl Future<Output = ShiftResult<u64>> + Send;

    /// Overwrites the offset of `table_name`.
    ///
    /// Fails with [`crate::error::ErrorKind::ProgressNotFound`] if the table was never passed
    /// to [`ProgressStore::ensure`].
    fn set(&self, table_name: &str, offset: u64) -> impl Future<Output = ShiftResult<()>> + Send;
}
