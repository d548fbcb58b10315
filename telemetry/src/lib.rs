//! Tracing setup shared by the dshift binary and the test suites.

pub mod tracing;

pub use tracing::init_test_tracing;
