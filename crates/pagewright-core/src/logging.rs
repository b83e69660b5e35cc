//! Logging abstraction layer for pagewright
//!
//! This module provides logging macros that work across WASM and native targets.
//! Browser builds write to the developer console, native builds emit `tracing`
//! events so that a host subscriber decides where they end up.
//!
//! ## Macro Overview
//!
//! | Macro | Active when | WASM | Non-WASM |
//! |-------|-------------|------|----------|
//! | `debug_log!` | `debug-hooks` + (`debug_assertions` or `release-logs`) | `console.debug` | `tracing::debug!` |
//! | `info_log!` | `debug_assertions` or `release-logs` | `console.info` | `tracing::info!` |
//! | `warn_log!` | `debug_assertions` or `release-logs` | `console.warn` | `tracing::warn!` |
//! | `error_log!` | `debug_assertions` or `release-logs` | `console.error` | `tracing::error!` |
//!
//! Inactive macros still type-check their arguments, so a log line never hides
//! an unused-variable warning.
//!
//! ## Example
//!
//! ```ignore
//! use pagewright_core::{info_log, warn_log};
//!
//! info_log!("Soft navigation to {} finished", url);
//! warn_log!("Marker {} registered twice", marker);
//! ```

/// Logs a debug message (requires the `debug-hooks` feature)
#[macro_export]
#[cfg(all(
	any(debug_assertions, feature = "release-logs"),
	feature = "debug-hooks",
	target_arch = "wasm32"
))]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		$crate::__private::web_sys::console::debug_1(&format!($($arg)*).into());
	}};
}

/// Logs a debug message (requires the `debug-hooks` feature)
#[macro_export]
#[cfg(all(
	any(debug_assertions, feature = "release-logs"),
	feature = "debug-hooks",
	not(target_arch = "wasm32")
))]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		$crate::__private::tracing::debug!(target: "pagewright", "{}", format!($($arg)*));
	}};
}

/// No-op debug_log when conditions are not met
#[macro_export]
#[cfg(not(all(any(debug_assertions, feature = "release-logs"), feature = "debug-hooks")))]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		let _ = format_args!($($arg)*);
	}};
}

/// Logs an info message
///
/// # Example
///
/// ```ignore
/// info_log!("Runtime initialized");
/// ```
#[macro_export]
#[cfg(all(any(debug_assertions, feature = "release-logs"), target_arch = "wasm32"))]
macro_rules! info_log {
	($($arg:tt)*) => {{
		$crate::__private::web_sys::console::info_1(&format!($($arg)*).into());
	}};
}

/// Logs an info message
#[macro_export]
#[cfg(all(any(debug_assertions, feature = "release-logs"), not(target_arch = "wasm32")))]
macro_rules! info_log {
	($($arg:tt)*) => {{
		$crate::__private::tracing::info!(target: "pagewright", "{}", format!($($arg)*));
	}};
}

/// No-op info_log in release builds
#[macro_export]
#[cfg(not(any(debug_assertions, feature = "release-logs")))]
macro_rules! info_log {
	($($arg:tt)*) => {{
		let _ = format_args!($($arg)*);
	}};
}

/// Logs a warning message
///
/// Used for recoverable faults: duplicate registrations, handlers that
/// returned an error.
#[macro_export]
#[cfg(all(any(debug_assertions, feature = "release-logs"), target_arch = "wasm32"))]
macro_rules! warn_log {
	($($arg:tt)*) => {{
		$crate::__private::web_sys::console::warn_1(&format!($($arg)*).into());
	}};
}

/// Logs a warning message
#[macro_export]
#[cfg(all(any(debug_assertions, feature = "release-logs"), not(target_arch = "wasm32")))]
macro_rules! warn_log {
	($($arg:tt)*) => {{
		$crate::__private::tracing::warn!(target: "pagewright", "{}", format!($($arg)*));
	}};
}

/// No-op warn_log in release builds
#[macro_export]
#[cfg(not(any(debug_assertions, feature = "release-logs")))]
macro_rules! warn_log {
	($($arg:tt)*) => {{
		let _ = format_args!($($arg)*);
	}};
}

/// Logs an error message
///
/// # Example
///
/// ```ignore
/// error_log!("Install of {} failed: {}", key, error);
/// ```
#[macro_export]
#[cfg(all(any(debug_assertions, feature = "release-logs"), target_arch = "wasm32"))]
macro_rules! error_log {
	($($arg:tt)*) => {{
		$crate::__private::web_sys::console::error_1(&format!($($arg)*).into());
	}};
}

/// Logs an error message
#[macro_export]
#[cfg(all(any(debug_assertions, feature = "release-logs"), not(target_arch = "wasm32")))]
macro_rules! error_log {
	($($arg:tt)*) => {{
		$crate::__private::tracing::error!(target: "pagewright", "{}", format!($($arg)*));
	}};
}

/// No-op error_log in release builds
#[macro_export]
#[cfg(not(any(debug_assertions, feature = "release-logs")))]
macro_rules! error_log {
	($($arg:tt)*) => {{
		let _ = format_args!($($arg)*);
	}};
}
