use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::logging::{LogEntry, LogLevel, Logger, TimeProvider, get_time_provider};
use crate::time_utils;

/// Console logger: browser console on wasm32, stderr elsewhere
pub struct ConsoleLogger {
    min_level: LogLevel,
}

impl ConsoleLogger {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }

    pub fn new_production() -> Self {
        Self::new(LogLevel::Info)
    }

    pub fn new_development() -> Self {
        Self::new(LogLevel::Debug)
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    pub fn format_log_entry(&self, entry: &LogEntry) -> String {
        let timestamp = get_time_provider().format_timestamp(entry.timestamp);
        match &entry.metadata {
            Some(metadata) => format!(
                "[{}] {} {} | {} | {}",
                timestamp, entry.level, entry.component, entry.message, metadata
            ),
            None => format!("[{}] {} {} | {}", timestamp, entry.level, entry.component, entry.message),
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn write(level: LogLevel, line: String) {
        let line = wasm_bindgen::JsValue::from(line);
        match level {
            LogLevel::Trace | LogLevel::Debug => web_sys::console::debug_1(&line),
            LogLevel::Info => web_sys::console::info_1(&line),
            LogLevel::Warn => web_sys::console::warn_1(&line),
            LogLevel::Error => web_sys::console::error_1(&line),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn write(_level: LogLevel, line: String) {
        eprintln!("{line}");
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, entry: LogEntry) {
        if entry.level >= self.min_level {
            Self::write(entry.level, self.format_log_entry(&entry));
        }
    }
}

/// Wall clock: `Date.now()` in the browser, `SystemTime` natively
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeProvider;

impl SystemTimeProvider {
    pub fn new() -> Self {
        Self
    }
}

impl TimeProvider for SystemTimeProvider {
    fn current_timestamp(&self) -> u64 {
        time_utils::now_millis()
    }

    fn format_timestamp(&self, timestamp: u64) -> String {
        time_utils::format_millis(timestamp)
    }
}

/// Clock moved by hand, for tests and replays of recorded sessions
#[derive(Debug, Default)]
pub struct ManualTimeProvider {
    now: AtomicU64,
}

impl ManualTimeProvider {
    pub fn new(start: u64) -> Self {
        Self { now: AtomicU64::new(start) }
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Returns the new time.
    pub fn advance(&self, delta_ms: u64) -> u64 {
        self.now.fetch_add(delta_ms, Ordering::SeqCst) + delta_ms
    }
}

impl TimeProvider for ManualTimeProvider {
    fn current_timestamp(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn format_timestamp(&self, timestamp: u64) -> String {
        time_utils::format_millis(timestamp)
    }
}
