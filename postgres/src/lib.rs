//! Postgres helpers shared by the dshift crates.
//!
//! [`progress`] owns the SQL of the `_shift_state` table that remembers how far each table has
//! been shifted. [`test_utils`] creates and drops throwaway databases for integration tests.

pub mod progress;
#[cfg(feature = "test-utils")]
pub mod test_utils;
