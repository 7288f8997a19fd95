//! Coding errors and warnings.
//!
//! A coding error reports a violated API contract: a caller handed the library something it
//! promised never to hand over. It is reported loudly and synchronously, never returned as a
//! recoverable error. Warnings report suspicious but tolerated data.

use std::fmt;

#[doc(hidden)]
pub fn report_coding_error(module: &str, args: fmt::Arguments) {
	tracing::error!(target: "tf::coding_error", module, "{}", args);

	if cfg!(feature = "strict-coding-errors") {
		panic!("Coding error in {module}: {args}");
	}
}

#[doc(hidden)]
pub fn report_warning(module: &str, args: fmt::Arguments) {
	tracing::warn!(target: "tf::warning", module, "{}", args);
}

/// Report a violated API contract.
macro_rules! coding_error {
	($($arg:tt)*) => {
		$crate::tf::diagnostic::report_coding_error(module_path!(), format_args!($($arg)*))
	};
}

/// Report suspicious data that is tolerated.
macro_rules! warning {
	($($arg:tt)*) => {
		$crate::tf::diagnostic::report_warning(module_path!(), format_args!($($arg)*))
	};
}

pub(crate) use coding_error;
pub(crate) use warning;
