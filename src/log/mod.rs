//! Kernel-style logging
//!
//! Messages go through the `pr_*` macros into a global [`LogCore`]: a bounded
//! ring buffer filtered by a global level, with entries at or above the console
//! level also forwarded to an installed [`ConsoleSink`].

pub mod buffer;
pub mod config;
pub mod entry;
pub mod level;
pub mod log_core;
#[macro_use]
pub mod macros;

#[cfg(test)]
mod tests;

use alloc::sync::Arc;

pub use entry::LogEntry;
pub use level::LogLevel;
pub use log_core::{ConsoleSink, LogCore};

static GLOBAL_LOG: LogCore = LogCore::default();

/// Checks the global level before the message is formatted
#[inline(always)]
#[doc(hidden)]
pub fn is_level_enabled(level: LogLevel) -> bool {
    GLOBAL_LOG.is_level_enabled(level)
}

/// Backend of the `pr_*` macros
#[doc(hidden)]
pub fn log_impl(level: LogLevel, args: core::fmt::Arguments) {
    GLOBAL_LOG._log(level, args);
}

/// Sets the global log level threshold
pub fn set_global_level(level: LogLevel) {
    GLOBAL_LOG._set_global_level(level);
}

/// Gets the current global log level
pub fn get_global_level() -> LogLevel {
    GLOBAL_LOG._get_global_level()
}

/// Sets the console output level threshold
pub fn set_console_level(level: LogLevel) {
    GLOBAL_LOG._set_console_level(level);
}

/// Gets the current console output level
pub fn get_console_level() -> LogLevel {
    GLOBAL_LOG._get_console_level()
}

/// Installs the sink that receives console-level entries
pub fn set_console(sink: Option<Arc<dyn ConsoleSink>>) {
    GLOBAL_LOG._set_console(sink);
}

/// Reads the next entry from the global buffer
pub fn read_log() -> Option<LogEntry> {
    GLOBAL_LOG._read_log()
}

/// Number of unread entries in the global buffer
pub fn log_len() -> usize {
    GLOBAL_LOG._log_len()
}

/// Number of entries overwritten before they were read
pub fn log_dropped_count() -> usize {
    GLOBAL_LOG._log_dropped_count()
}
