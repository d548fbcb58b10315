//! Utilities shared by the unit and integration tests of this crate.
//!
//! [`memory_source`] and [`memory_target`] emulate just enough of Postgres to exercise the
//! engine without a server. [`database`] spawns throwaway databases on the server named by
//! `TESTS_DATABASE_URL` and [`failpoints`] scopes fail point configurations to a test.
pub mod database;
pub mod failpoints;
pub mod memory_source;
pub mod memory_target;
