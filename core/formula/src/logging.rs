//! FILENAME: core/formula/src/logging.rs
// PURPOSE: Category-tagged logging macros for the formula engine.
// CONTEXT: The crate is a library, so it never owns a log file or installs a
// logger. Every macro forwards to the `log` facade with the category as the
// log target; the embedding application decides where lines end up.

#[doc(hidden)]
pub use log as __log;

/// Format the message of an ENTER line for function tracing.
pub fn enter_message(func_name: &str, params: &str) -> String {
    if params.is_empty() {
        format!("ENTER {}", func_name)
    } else {
        format!("ENTER {} {}", func_name, params)
    }
}

/// Format the message of an EXIT line for function tracing.
pub fn exit_message(func_name: &str, result: &str) -> String {
    if result.is_empty() {
        format!("EXIT {}", func_name)
    } else {
        format!("EXIT {} {}", func_name, result)
    }
}

// ============================================================================
// MACRO DEFINITIONS & EXPORTS
// ============================================================================

#[macro_export]
macro_rules! log_debug {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::__log::debug!(target: $cat, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::__log::warn!(target: $cat, $($arg)*)
    };
}

// ENTER/EXIT macros for function tracing

#[macro_export]
macro_rules! log_enter {
    ($cat:expr, $func:expr) => {
        $crate::logging::__log::trace!(target: $cat, "{}", $crate::logging::enter_message($func, ""))
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        $crate::logging::__log::trace!(target: $cat, "{}", $crate::logging::enter_message($func, &format!($($arg)*)))
    };
}

#[macro_export]
macro_rules! log_exit {
    ($cat:expr, $func:expr) => {
        $crate::logging::__log::trace!(target: $cat, "{}", $crate::logging::exit_message($func, ""))
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        $crate::logging::__log::trace!(target: $cat, "{}", $crate::logging::exit_message($func, &format!($($arg)*)))
    };
}
