//! logging — line-oriented progress sink.
//!
//! Purpose
//! -------
//! Let callers decide where the human-readable progress text of an SSA run
//! goes (epoch heuristics, regularization notices, per-restart summaries)
//! without the numerical code knowing about terminals or files.
//!
//! Key behaviors
//! -------------
//! - [`LogSink`] receives one finished line at a time together with a
//!   [`LogLevel`].
//! - [`TracingSink`] (the default) forwards lines as `tracing` events under
//!   the `rust_ssa` target, so any installed subscriber picks them up.
//! - [`MemorySink`] keeps lines in memory; [`NullSink`] drops them.
//!
//! Conventions
//! -----------
//! - Fine-grained numerical diagnostics (per-iteration losses, step sizes)
//!   are emitted with `tracing::debug!` directly and never reach a sink.
use std::sync::Mutex;

/// Severity of a progress line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
}

/// Receiver for progress text.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, line: &str);

    fn info(&self, line: &str) {
        self.log(LogLevel::Info, line);
    }

    fn warn(&self, line: &str) {
        self.log(LogLevel::Warn, line);
    }
}

/// Forwards lines to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, line: &str) {
        match level {
            LogLevel::Info => tracing::info!(target: "rust_ssa", "{line}"),
            LogLevel::Warn => tracing::warn!(target: "rust_ssa", "{line}"),
        }
    }
}

/// Discards every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _level: LogLevel, _line: &str) {}
}

/// Collects lines in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the text received so far.
    pub fn lines(&self) -> Vec<String> {
        self.entries().into_iter().map(|(_, l)| l).collect()
    }

    /// Lines logged at `level`.
    pub fn lines_at(&self, level: LogLevel) -> Vec<String> {
        self.entries().into_iter().filter(|(lv, _)| *lv == level).map(|(_, l)| l).collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }

    fn entries(&self) -> Vec<(LogLevel, String)> {
        match self.lines.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: LogLevel, line: &str) {
        let mut guard = match self.lines.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push((level, line.to_owned()));
    }
}
