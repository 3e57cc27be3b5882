//! Opt-in structural validation of the level hierarchy.
//!
//! The rebuild touches neighbor links, father/son wiring and edge
//! reference counts on two levels at once; a slip in any of them tends to
//! surface passes later as a bogus reconciliation error. The driver
//! therefore re-validates the whole multigrid after every pass in debug
//! builds, and the `check-invariants` / `strict-invariants` features keep
//! that validation in optimized test runs and release builds.

use crate::mesh_error::RefineError;

/// Structures that can check their own consistency.
pub trait DebugInvariants {
    /// Panics on the first violated invariant when checking is compiled
    /// in; does nothing otherwise.
    fn debug_assert_invariants(&self);
    /// Walks every invariant and reports the first violation.
    fn validate_invariants(&self) -> Result<(), RefineError>;
}

/// Runs a fallible check and panics with its error when invariant
/// checking is compiled in. The check expression is not evaluated at all
/// in unchecked builds.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::mesh_error::RefineError;
    use crate::topology::point::ElemId;

    fn check(ok: bool) -> Result<(), RefineError> {
        if ok {
            Ok(())
        } else {
            Err(RefineError::UnknownElement(ElemId::new(1)))
        }
    }

    #[test]
    fn passing_check_is_silent() {
        crate::debug_invariants!(check(true), "grid");
    }

    #[test]
    #[should_panic(expected = "[invariants] grid")]
    fn failing_check_panics_with_context() {
        crate::debug_invariants!(check(false), "grid");
    }
}
