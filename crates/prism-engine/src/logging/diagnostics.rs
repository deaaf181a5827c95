use std::fmt;
use std::sync::{Arc, Mutex};

use log::Level;

/// Destination for component diagnostics.
pub trait LogSink: Send + Sync {
    fn emit(&self, level: Level, scope: &str, message: &str);
}

/// Forwards diagnostics to the global `log` facade.
#[derive(Debug, Default, Copy, Clone)]
pub struct FacadeSink;

impl LogSink for FacadeSink {
    fn emit(&self, level: Level, scope: &str, message: &str) {
        log::log!(level, "{scope} : {message}");
    }
}

/// One captured diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub scope: String,
    pub message: String,
}

/// Keeps every diagnostic in memory. Intended for tests and headless tools.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Returns `true` if any captured message at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records()
            .iter()
            .any(|r| r.level == level && r.message.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn emit(&self, level: Level, scope: &str, message: &str) {
        if let Ok(mut records) = self.records.lock() {
            records.push(LogRecord {
                level,
                scope: scope.to_string(),
                message: message.to_string(),
            });
        }
    }
}

/// Scoped diagnostics handle injected into engine components.
///
/// Cloning is cheap; `scoped` derives a child handle that shares the sink.
#[derive(Clone)]
pub struct Diagnostics {
    sink: Arc<dyn LogSink>,
    scope: Arc<str>,
}

impl Diagnostics {
    pub fn new(sink: Arc<dyn LogSink>, scope: impl Into<Arc<str>>) -> Self {
        Self {
            sink,
            scope: scope.into(),
        }
    }

    /// Handle that writes through the `log` facade.
    pub fn facade(scope: impl Into<Arc<str>>) -> Self {
        Self::new(Arc::new(FacadeSink), scope)
    }

    /// Same sink, different scope label.
    pub fn scoped(&self, scope: impl Into<Arc<str>>) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            scope: scope.into(),
        }
    }

    pub fn log(&self, level: Level, message: impl fmt::Display) {
        self.sink.emit(level, &self.scope, &message.to_string());
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::Info, message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(Level::Warn, message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(Level::Error, message);
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics").field("scope", &self.scope).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_handles_share_the_sink() {
        let sink = Arc::new(MemorySink::new());
        let root = Diagnostics::new(sink.clone(), "scene");
        let child = root.scoped("object Triangle_1");

        root.info("ready");
        child.warn(format_args!("missing {}", "default.vert"));

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].scope, "scene");
        assert_eq!(records[1].scope, "object Triangle_1");
        assert_eq!(records[1].message, "missing default.vert");
        assert!(sink.contains(Level::Warn, "default.vert"));
        assert!(!sink.contains(Level::Error, "default.vert"));
    }
}
