use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// Caller-supplied sink for human-readable run output.
///
/// Everything a user should see about a run (progress lines, pod events,
/// container log lines) goes through this interface and nowhere else.
pub trait TaskSink: Send + Sync {
    fn line(&self, level: LogLevel, message: &str);
}

/// Per-run logger forwarding to an optional [`TaskSink`].
///
/// A run without a sink still executes; output is simply discarded.
#[derive(Clone, Default)]
pub struct TaskLogger {
    sink: Option<Arc<dyn TaskSink>>,
}

impl TaskLogger {
    pub fn new(sink: Option<Arc<dyn TaskSink>>) -> Self {
        Self { sink }
    }

    pub fn debug(&self, message: &str) {
        self.emit(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.emit(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.emit(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.emit(LogLevel::Error, message);
    }

    fn emit(&self, level: LogLevel, message: &str) {
        if let Some(sink) = &self.sink {
            sink.line(level, message);
        }
    }
}

impl fmt::Debug for TaskLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskLogger")
            .field("attached", &self.sink.is_some())
            .finish()
    }
}
