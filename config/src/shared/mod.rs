//! Shared configuration types for dshift.

mod base;
mod connection;
mod shift;
mod table;

pub use base::ValidationError;
pub use connection::{DatabaseConfig, DatabaseDriver, DefaultPgConnectionOptions, IntoConnectOptions, TlsConfig};
pub use shift::ShiftConfig;
pub use table::{ColumnConfig, TableConfig};
