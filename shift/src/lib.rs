//! Resumable table shifting between two Postgres databases.
//!
//! A shift copies the rows of each configured source table into its target table one page at
//! a time, persisting after every page how many rows have been transferred. A later run picks
//! up from that offset, so an interrupted shift is resumed simply by running it again.
//!
//! Rows are written either by bulk loading them ([`engine::WriteMode::Append`]) or by
//! upserting them on the target's primary key ([`engine::WriteMode::Merge`]). Upserts carry
//! an `IS DISTINCT FROM` guard so replaying a page never rewrites unchanged rows.
//!
//! The engine talks to the outside world through three capabilities: a [`source::Source`] to
//! read pages, a [`target::Target`] to write them, and a [`store::progress::ProgressStore`] to
//! keep offsets. Postgres implementations of all three ship with the crate.

pub mod client;
pub mod conversions;
pub mod engine;
pub mod error;
pub mod failpoints;
mod macros;
pub mod metrics;
pub mod pipeline;
pub mod scan;
pub mod schema;
pub mod source;
pub mod sql;
pub mod store;
pub mod target;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
