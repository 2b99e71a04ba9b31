//! The [`Log`] trait and an in-memory implementation.
use std::sync::Mutex;

/// Abstraction over logging backends.
///
/// Library code only sees `&dyn Log` / `Arc<dyn Log>`; the binary plugs in
/// [`Logger`](super::logger::Logger), tests plug in [`MemoryLog`].
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
}

/// Severity of a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Stage header.
    Stage,
    /// Informational message.
    Info,
    /// Debug message.
    Debug,
    /// Warning.
    Warn,
    /// Error.
    Error,
}

/// One message captured by [`MemoryLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Severity the message was logged at.
    pub severity: Severity,
    /// Message text.
    pub message: String,
}

/// A [`Log`] that keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: Mutex<Vec<Record>>,
}

impl MemoryLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record so far, in logging order.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Messages logged at `severity`, in logging order.
    #[must_use]
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|r| r.severity == severity)
            .map(|r| r.message)
            .collect()
    }

    fn push(&self, severity: Severity, msg: &str) {
        if let Ok(mut guard) = self.records.lock() {
            guard.push(Record {
                severity,
                message: msg.to_string(),
            });
        }
    }
}

impl Log for MemoryLog {
    fn stage(&self, msg: &str) {
        self.push(Severity::Stage, msg);
    }

    fn info(&self, msg: &str) {
        self.push(Severity::Info, msg);
    }

    fn debug(&self, msg: &str) {
        self.push(Severity::Debug, msg);
    }

    fn warn(&self, msg: &str) {
        self.push(Severity::Warn, msg);
    }

    fn error(&self, msg: &str) {
        self.push(Severity::Error, msg);
    }
}
