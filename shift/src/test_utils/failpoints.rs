use fail::FailScenario;

use crate::failpoints::SHIFT_BEFORE_CURSOR_ADVANCE;

/// Keeps a shift fail point armed until dropped.
///
/// The fail registry is global, so a test arming a point holds the [`FailScenario`] lock for
/// its whole lifetime and runs alone among fail point tests.
pub struct ArmedFailPoint<'a> {
    _scenario: FailScenario<'a>,
    name: &'static str,
}

impl<'a> ArmedFailPoint<'a> {
    /// Arms `name` with a `fail` action such as `return`, `panic` or `1*return->off`.
    pub fn arm(name: &'static str, action: &str) -> ArmedFailPoint<'a> {
        let scenario = FailScenario::setup();
        if let Err(err) = fail::cfg(name, action) {
            panic!("invalid action `{action}` for fail point `{name}`: {err}");
        }

        Self {
            _scenario: scenario,
            name,
        }
    }

    /// Makes every page write fail to record its offset, as a crash right after the write would.
    pub fn before_cursor_advance() -> ArmedFailPoint<'a> {
        Self::arm(SHIFT_BEFORE_CURSOR_ADVANCE, "return")
    }

    pub fn disarm(self) {
        drop(self);
    }
}

impl Drop for ArmedFailPoint<'_> {
    fn drop(&mut self) {
        fail::remove(self.name);
    }
}
