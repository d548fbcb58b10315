use fail::fail_point;

use crate::bail;
use crate::error::{ErrorKind, ShiftError, ShiftResult};

/// Between a page write and the offset update that records it.
pub const SHIFT_BEFORE_CURSOR_ADVANCE: &str = "shift.before_cursor_advance";

/// Returns an error when the fail point `name` is configured to `return`.
pub fn shift_fail_point(name: &str) -> ShiftResult<()> {
    fail_point!(name, |parameter: Option<String>| -> Result<(), ShiftError> {
        let detail = match parameter {
            Some(parameter) => format!("The failpoint '{name}' returned an error: {parameter}"),
            None => format!("The failpoint '{name}' returned an error"),
        };

        bail!(
            ErrorKind::FailpointTriggered,
            "An error occurred in a fail point",
            detail
        );
    });

    Ok(())
}
