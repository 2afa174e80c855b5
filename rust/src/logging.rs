//! Logging macros for the scheduling engine with verbosity level control.
//!
//! Events go through the `tracing` facade; the host application owns the subscriber.
//! Logging is skipped entirely when the verbosity is below the macro's level.
//! Verbosity levels:
//! - 0: SILENT (nothing)
//! - 1: CHANGES (pass boundaries, schedule results) -> `tracing::info!`
//! - 2: CHECKS (constraint decisions, out-of-sequence detection) -> `tracing::debug!`
//! - 3: DEBUG (per-activity timings) -> `tracing::trace!`

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at CHANGES level (verbosity >= 1).
///
/// Used for: pass boundaries, project finish, violation counts.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            ::tracing::info!($($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: constraint application, out-of-sequence relationships, rejected updates.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            ::tracing::debug!($($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
///
/// Used for: per-activity offsets in the forward and backward passes.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            ::tracing::trace!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_verbosity_ordering() {
        assert!(VERBOSITY_SILENT < VERBOSITY_CHANGES);
        assert!(VERBOSITY_CHANGES < VERBOSITY_CHECKS);
        assert!(VERBOSITY_CHECKS < VERBOSITY_DEBUG);
    }

    #[traced_test]
    #[test]
    fn test_silent_verbosity_emits_nothing() {
        let verbosity = VERBOSITY_SILENT;
        log_changes!(verbosity, "pass finished for {}", "silent-project");
        log_checks!(verbosity, "checked {}", "silent-project");
        log_debug!(verbosity, "timing {}", "silent-project");
        assert!(!logs_contain("silent-project"));
    }

    #[traced_test]
    #[test]
    fn test_levels_reach_tracing() {
        let verbosity = VERBOSITY_DEBUG;
        log_changes!(verbosity, "changes level {}", "alpha");
        log_checks!(verbosity, "checks level {}", "beta");
        log_debug!(verbosity, "debug level {}", "gamma");
        assert!(logs_contain("changes level alpha"));
        assert!(logs_contain("checks level beta"));
        assert!(logs_contain("debug level gamma"));
    }

    #[traced_test]
    #[test]
    fn test_changes_only_filters_higher_levels() {
        let verbosity = VERBOSITY_CHANGES;
        log_changes!(verbosity, "kept {}", "delta");
        log_checks!(verbosity, "dropped {}", "epsilon");
        assert!(logs_contain("kept delta"));
        assert!(!logs_contain("dropped epsilon"));
    }
}
