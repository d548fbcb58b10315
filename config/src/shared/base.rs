use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// TLS is enabled but no trusted root certificates are provided.
    #[error("Invalid TLS config: `trusted_root_certs` must be set when `enabled` is true")]
    MissingTrustedRootCerts,
    /// The connection url can't be parsed for the configured driver.
    #[error("Invalid connection url for the `{driver}` driver: {reason}")]
    InvalidUrl { driver: String, reason: String },
    /// A table has an empty name.
    #[error("Table names can't be empty")]
    EmptyTableName,
    /// The same table is declared twice on one side.
    #[error("Table `{table}` is declared more than once")]
    DuplicateTable { table: String },
    /// A table declares no columns.
    #[error("Table `{table}` must declare at least one column")]
    NoColumns { table: String },
    /// A column name is empty or declared twice.
    #[error("Table `{table}` has an empty or duplicated column `{column}`")]
    InvalidColumn { table: String, column: String },
    /// A table has a zero page size.
    #[error("Table `{table}`: `read_limit` must be greater than 0")]
    ZeroReadLimit { table: String },
    /// A table sets both `read_delay` and `read_delay_ms`.
    #[error("Table `{table}`: set only one of `read_delay` and `read_delay_ms`")]
    ConflictingReadDelay { table: String },
    /// The primary key of a table is not one of its columns.
    #[error("Table `{table}`: primary key `{primary_key}` is not one of its columns")]
    PrimaryKeyNotAColumn { table: String, primary_key: String },
    /// A source table has no matching target table.
    #[error("missing target for {source_table}; ensure table names match, target has a source_name")]
    MissingTargetTable { source_table: String },
}
