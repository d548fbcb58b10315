//! Error types and result definitions for shift operations.
//!
//! [`ShiftError`] carries an [`ErrorKind`] used to decide how a failure is reported, a static
//! description, an optional dynamic detail, the originating error and the callsite where the
//! error was created.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use config::shared::ValidationError;

/// Convenient result type for shift operations using [`ShiftError`] as the error type.
pub type ShiftResult<T> = Result<T, ShiftError>;

/// Main error type for shift operations.
///
/// The error is cheap to clone: the source and the backtrace are reference counted.
#[derive(Debug, Clone)]
pub struct ShiftError {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Categories of errors that can occur while shifting tables.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Configuration Errors
    ConfigError,
    MissingTableMapping,
    MissingPrimaryKey,
    ProgressNotFound,

    // Shift Phase Errors
    SourceReadFailed,
    TargetWriteFailed,
    ProgressStoreFailed,

    // Statement Errors
    StatementBuildFailed,

    // Driver Errors
    ConnectionFailed,
    AuthenticationError,
    QueryFailed,
    SchemaError,
    ConstraintViolation,
    InvalidState,

    // Data Errors
    ConversionError,
    InvalidData,

    // IO & Security Errors
    IoError,
    EncryptionError,

    // Unknown / Uncategorized
    Unknown,

    // Raised by fault injection in tests.
    #[cfg(feature = "failpoints")]
    FailpointTriggered,
}

impl ErrorKind {
    /// Returns `true` for errors caused by the configuration rather than by a failing system.
    ///
    /// Re-running a shift does not help with these until the configuration is fixed.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ErrorKind::ConfigError
                | ErrorKind::MissingTableMapping
                | ErrorKind::MissingPrimaryKey
                | ErrorKind::ProgressNotFound
        )
    }
}

impl ShiftError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the static description of this error.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        ShiftError {
            kind,
            description,
            detail,
            source,
            location: Location::caller(),
            backtrace: Arc::new(Backtrace::capture()),
        }
    }

    #[track_caller]
    fn from_error<E>(kind: ErrorKind, description: &'static str, err: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        let detail = err.to_string();
        ShiftError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

impl PartialEq for ShiftError {
    fn eq(&self, other: &ShiftError) -> bool {
        self.kind == other.kind
    }
}

impl fmt::Display for ShiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.kind,
            self.description,
            self.location.file(),
            self.location.line(),
            self.location.column()
        )?;

        write_detail(self.detail.as_deref(), f)?;
        write_backtrace(&self.backtrace, f)?;

        Ok(())
    }
}

impl error::Error for ShiftError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

fn write_backtrace(backtrace: &Backtrace, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if backtrace.status() != BacktraceStatus::Captured {
        return Ok(());
    }

    write!(f, "\n  Backtrace:")?;
    for line in backtrace.to_string().lines() {
        if line.trim().is_empty() {
            write!(f, "\n    ")?;
        } else {
            write!(f, "\n    {line}")?;
        }
    }

    Ok(())
}

fn write_detail(detail: Option<&str>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let Some(detail) = detail else {
        return Ok(());
    };

    if detail.trim().is_empty() {
        return write!(f, "\n  Detail: <empty>");
    }

    write!(f, "\n  Detail:")?;
    for line in detail.lines() {
        if line.trim().is_empty() {
            write!(f, "\n    ")?;
        } else {
            write!(f, "\n    {line}")?;
        }
    }

    Ok(())
}

/// Creates a [`ShiftError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for ShiftError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> ShiftError {
        ShiftError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`ShiftError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for ShiftError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> ShiftError {
        ShiftError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

impl From<std::io::Error> for ShiftError {
    #[track_caller]
    fn from(err: std::io::Error) -> ShiftError {
        ShiftError::from_error(ErrorKind::IoError, "I/O operation failed", err)
    }
}

impl From<serde_json::Error> for ShiftError {
    #[track_caller]
    fn from(err: serde_json::Error) -> ShiftError {
        let description = match err.classify() {
            serde_json::error::Category::Io => "JSON I/O operation failed",
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => "JSON conversion failed",
        };

        ShiftError::from_error(ErrorKind::ConversionError, description, err)
    }
}

/// Maps errors based on Postgres SQLSTATE codes.
impl From<tokio_postgres::Error> for ShiftError {
    #[track_caller]
    fn from(err: tokio_postgres::Error) -> ShiftError {
        let (kind, description) = match err.code() {
            Some(sqlstate) => {
                use tokio_postgres::error::SqlState;

                match *sqlstate {
                    // Connection errors (08xxx)
                    SqlState::CONNECTION_EXCEPTION
                    | SqlState::CONNECTION_DOES_NOT_EXIST
                    | SqlState::CONNECTION_FAILURE
                    | SqlState::SQLCLIENT_UNABLE_TO_ESTABLISH_SQLCONNECTION
                    | SqlState::SQLSERVER_REJECTED_ESTABLISHMENT_OF_SQLCONNECTION
                    | SqlState::TOO_MANY_CONNECTIONS
                    | SqlState::ADMIN_SHUTDOWN
                    | SqlState::CRASH_SHUTDOWN
                    | SqlState::CANNOT_CONNECT_NOW => (
                        ErrorKind::ConnectionFailed,
                        "PostgreSQL connection failed",
                    ),

                    // Authentication errors (28xxx)
                    SqlState::INVALID_AUTHORIZATION_SPECIFICATION | SqlState::INVALID_PASSWORD => (
                        ErrorKind::AuthenticationError,
                        "PostgreSQL authentication failed",
                    ),

                    // Data integrity violations (23xxx)
                    SqlState::INTEGRITY_CONSTRAINT_VIOLATION
                    | SqlState::NOT_NULL_VIOLATION
                    | SqlState::FOREIGN_KEY_VIOLATION
                    | SqlState::UNIQUE_VIOLATION
                    | SqlState::CHECK_VIOLATION => (
                        ErrorKind::ConstraintViolation,
                        "PostgreSQL constraint violation",
                    ),

                    // Data conversion errors (22xxx)
                    SqlState::DATA_EXCEPTION
                    | SqlState::INVALID_TEXT_REPRESENTATION
                    | SqlState::INVALID_DATETIME_FORMAT
                    | SqlState::NUMERIC_VALUE_OUT_OF_RANGE
                    | SqlState::DATETIME_FIELD_OVERFLOW
                    | SqlState::STRING_DATA_RIGHT_TRUNCATION
                    | SqlState::INVALID_BINARY_REPRESENTATION => (
                        ErrorKind::ConversionError,
                        "PostgreSQL data conversion failed",
                    ),

                    // Schema/object not found errors (42xxx)
                    SqlState::UNDEFINED_TABLE
                    | SqlState::UNDEFINED_COLUMN
                    | SqlState::UNDEFINED_SCHEMA
                    | SqlState::INVALID_COLUMN_REFERENCE
                    | SqlState::DATATYPE_MISMATCH => (
                        ErrorKind::SchemaError,
                        "PostgreSQL schema object not found or mismatched",
                    ),

                    // Transaction errors (40xxx, 25xxx)
                    SqlState::TRANSACTION_ROLLBACK
                    | SqlState::T_R_SERIALIZATION_FAILURE
                    | SqlState::T_R_DEADLOCK_DETECTED
                    | SqlState::IN_FAILED_SQL_TRANSACTION => {
                        (ErrorKind::InvalidState, "PostgreSQL transaction failed")
                    }

                    SqlState::IO_ERROR | SqlState::DISK_FULL => {
                        (ErrorKind::IoError, "PostgreSQL I/O error")
                    }

                    // Syntax, access and everything else
                    _ => (ErrorKind::QueryFailed, "PostgreSQL query failed"),
                }
            }
            // No SQL state means the connection itself failed.
            None => (
                ErrorKind::ConnectionFailed,
                "PostgreSQL connection failed",
            ),
        };

        ShiftError::from_error(kind, description, err)
    }
}

impl From<sqlx::Error> for ShiftError {
    #[track_caller]
    fn from(err: sqlx::Error) -> ShiftError {
        let kind = match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ErrorKind::ConstraintViolation
            }
            sqlx::Error::Database(_) => ErrorKind::QueryFailed,
            sqlx::Error::Io(_) => ErrorKind::IoError,
            sqlx::Error::Tls(_) => ErrorKind::EncryptionError,
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => ErrorKind::ConnectionFailed,
            sqlx::Error::Configuration(_) => ErrorKind::ConfigError,
            _ => ErrorKind::QueryFailed,
        };

        ShiftError::from_error(kind, "Database operation failed", err)
    }
}

impl From<rustls::Error> for ShiftError {
    #[track_caller]
    fn from(err: rustls::Error) -> ShiftError {
        ShiftError::from_error(ErrorKind::EncryptionError, "TLS configuration failed", err)
    }
}

impl From<uuid::Error> for ShiftError {
    #[track_caller]
    fn from(err: uuid::Error) -> ShiftError {
        ShiftError::from_error(ErrorKind::InvalidData, "UUID parsing failed", err)
    }
}

impl From<std::num::TryFromIntError> for ShiftError {
    #[track_caller]
    fn from(err: std::num::TryFromIntError) -> ShiftError {
        ShiftError::from_error(ErrorKind::ConversionError, "Integer conversion failed", err)
    }
}

/// Converts configuration validation errors. A source table without a target becomes
/// [`ErrorKind::MissingTableMapping`], everything else [`ErrorKind::ConfigError`].
impl From<ValidationError> for ShiftError {
    #[track_caller]
    fn from(err: ValidationError) -> ShiftError {
        let kind = match &err {
            ValidationError::MissingTargetTable { .. } => ErrorKind::MissingTableMapping,
            _ => ErrorKind::ConfigError,
        };

        ShiftError::from_error(kind, "Invalid configuration", err)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::{bail, shift_error};

    fn require_primary_key(primary_key: Option<&str>) -> ShiftResult<&str> {
        let Some(primary_key) = primary_key else {
            bail!(
                ErrorKind::MissingPrimaryKey,
                "Merging requires a primary key",
                detail = "target table `accounts` has no primary key".to_string()
            );
        };

        Ok(primary_key)
    }

    #[test]
    fn display_contains_kind_description_and_detail() {
        let err = shift_error!(
            ErrorKind::SourceReadFailed,
            "Source read failed",
            "users -> accounts: relation does not exist"
        );

        let rendered = err.to_string();

        assert!(rendered.starts_with("[SourceReadFailed] Source read failed @ "));
        assert!(rendered.contains("Detail:\n    users -> accounts: relation does not exist"));
    }

    #[test]
    fn source_is_preserved_across_clones() {
        let io = std::io::Error::other("disk on fire");
        let err = shift_error!(ErrorKind::TargetWriteFailed, "Write failed", source: io);

        let cloned = err.clone();

        assert_eq!(cloned.source().unwrap().to_string(), "disk on fire");
        assert_eq!(cloned, err);
    }

    #[test]
    fn missing_target_maps_to_missing_table_mapping() {
        let err: ShiftError = ValidationError::MissingTargetTable {
            source_table: "users".to_string(),
        }
        .into();

        assert_eq!(err.kind(), ErrorKind::MissingTableMapping);
        assert!(err.kind().is_configuration());
        assert_eq!(
            err.detail(),
            Some("missing target for users; ensure table names match, target has a source_name")
        );
    }

    #[test]
    fn io_errors_keep_their_message_as_detail() {
        let err: ShiftError = std::io::Error::other("broken pipe").into();

        assert_eq!(err.kind(), ErrorKind::IoError);
        assert_eq!(err.detail(), Some("broken pipe"));
        assert!(!err.kind().is_configuration());
    }

    #[test]
    fn bail_returns_an_error_located_at_the_call_site() {
        assert_eq!(require_primary_key(Some("id")).unwrap(), "id");

        let err = require_primary_key(None).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingPrimaryKey);
        assert_eq!(
            err.detail(),
            Some("target table `accounts` has no primary key")
        );
        assert_eq!(err.location().file(), file!());
    }
}
