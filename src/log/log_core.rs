//! Log system core implementation
//!
//! This module encapsulates all logging state and logic into a single
//! `LogCore` struct that can be instantiated independently for testing
//! while the global instance backs the `pr_*` macros.

use super::buffer::LogBuffer;
use super::config::{DEFAULT_CONSOLE_LEVEL, DEFAULT_LOG_LEVEL};
use super::entry::LogEntry;
use super::level::LogLevel;
use crate::sync::RwLock;
use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Destination for entries that pass the console level
///
/// A loaded module has no console of its own; whoever hosts it installs one.
pub trait ConsoleSink: Send + Sync {
    /// Emits an entry that passed the console level
    fn write_entry(&self, entry: &LogEntry);
}

/// Core logging system
///
/// Encapsulates the ring buffer and filtering state. Can be instantiated
/// for testing or used as a global singleton in production.
pub struct LogCore {
    /// Ring buffer for log storage
    buffer: LogBuffer,

    /// Global log level threshold (controls buffering)
    global_level: AtomicU8,

    /// Console output level threshold (controls immediate printing)
    console_level: AtomicU8,

    /// Sequence number handed to the next entry
    next_seq: AtomicUsize,

    console: RwLock<Option<Arc<dyn ConsoleSink>>>,
}

impl LogCore {
    /// Creates a new LogCore instance with default log levels
    ///
    /// Uses default levels from config:
    /// - Global level: Info (Debug logs are filtered)
    /// - Console level: Warning (only warnings and errors printed)
    pub const fn default() -> Self {
        Self {
            buffer: LogBuffer::new(),
            global_level: AtomicU8::new(DEFAULT_LOG_LEVEL as u8),
            console_level: AtomicU8::new(DEFAULT_CONSOLE_LEVEL as u8),
            next_seq: AtomicUsize::new(0),
            console: RwLock::new(None),
        }
    }

    /// Creates a new LogCore instance with custom log levels
    ///
    /// # Parameters
    ///
    /// * `global_level` - Minimum level for logs to be buffered
    /// * `console_level` - Minimum level for logs to be sent to the console sink
    pub fn new(global_level: LogLevel, console_level: LogLevel) -> Self {
        Self {
            buffer: LogBuffer::new(),
            global_level: AtomicU8::new(global_level as u8),
            console_level: AtomicU8::new(console_level as u8),
            next_seq: AtomicUsize::new(0),
            console: RwLock::new(None),
        }
    }

    /// Core logging implementation
    ///
    /// Called by the production macros (via the global instance) and by
    /// test code (via local instances).
    pub fn _log(&self, level: LogLevel, args: fmt::Arguments) {
        if !self.is_level_enabled(level) {
            return;
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let entry = LogEntry::from_args(level, seq, args);

        if self.is_console_level(level)
            && let Some(console) = self.console.read().as_ref()
        {
            console.write_entry(&entry);
        }

        self.buffer.write(entry);
    }

    /// Reads the next log entry from the buffer
    ///
    /// Returns `None` if no entries are available.
    pub fn _read_log(&self) -> Option<LogEntry> {
        self.buffer.read()
    }

    /// Returns the number of unread log entries
    pub fn _log_len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the count of logs dropped due to buffer overflow
    pub fn _log_dropped_count(&self) -> usize {
        self.buffer.dropped_count()
    }

    /// Sets the global log level threshold
    ///
    /// Logs with level > threshold will be discarded.
    pub fn _set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Release);
    }

    /// Gets the current global log level
    pub fn _get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Acquire))
    }

    /// Sets the console output level threshold
    pub fn _set_console_level(&self, level: LogLevel) {
        self.console_level.store(level as u8, Ordering::Release);
    }

    /// Gets the current console output level
    pub fn _get_console_level(&self) -> LogLevel {
        LogLevel::from_u8(self.console_level.load(Ordering::Acquire))
    }

    /// Installs (or removes, with `None`) the console sink
    pub fn _set_console(&self, sink: Option<Arc<dyn ConsoleSink>>) {
        *self.console.write() = sink;
    }

    // ========== Internal helpers ==========

    /// Checks if a log level is enabled (global filter)
    #[inline(always)]
    pub(super) fn is_level_enabled(&self, level: LogLevel) -> bool {
        level as u8 <= self.global_level.load(Ordering::Acquire)
    }

    #[inline(always)]
    fn is_console_level(&self, level: LogLevel) -> bool {
        level as u8 <= self.console_level.load(Ordering::Acquire)
    }
}
