//! Shorthands for building [`crate::error::ShiftError`]s.
//!
//! Every failure raised by the shift code itself goes through these macros, so the error
//! records the call site (`#[track_caller]` on the conversions) and the table context travels
//! in the detail:
//!
//! ```ignore
//! bail!(
//!     ErrorKind::MissingPrimaryKey,
//!     "Merging requires a primary key",
//!     format!("target table `{}` has no primary key", table.name)
//! );
//! ```

/// Builds a [`crate::error::ShiftError`] without returning it.
///
/// Used where an error is mapped rather than raised, typically in `map_err` around a database
/// call: `shift_error!(ErrorKind::ProgressStoreFailed, "Failed to prepare progress", source:
/// err)`. The detail is anything implementing `Display`; `detail = ` takes an owned
/// [`String`] without copying it.
#[macro_export]
macro_rules! shift_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::ShiftError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::ShiftError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, detail = $detail:expr) => {
        $crate::error::ShiftError::from(($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, detail = $detail:expr, source: $source:expr) => {
        $crate::error::ShiftError::from(($kind, $desc, $detail)).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::ShiftError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::ShiftError::from(($kind, $desc, $detail.to_string())).with_source($source)
    };
}

/// Returns early with a [`crate::error::ShiftError`], taking the arguments of [`shift_error!`].
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return ::core::result::Result::Err($crate::shift_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::shift_error!($kind, $desc, source: $source))
    };
    ($kind:expr, $desc:expr, detail = $detail:expr) => {
        return ::core::result::Result::Err($crate::shift_error!($kind, $desc, detail = $detail))
    };
    ($kind:expr, $desc:expr, detail = $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::shift_error!(
            $kind,
            $desc,
            detail = $detail,
            source: $source
        ))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::shift_error!($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::shift_error!(
            $kind,
            $desc,
            $detail,
            source: $source
        ))
    };
}
