use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failure,
}

impl RunOutcome {
    /// Label value used by metric backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Success => "success",
            RunOutcome::Failure => "failed",
        }
    }
}

/// Process-wide run metrics, shared across concurrent runs.
///
/// One instance is constructed at bootstrap and injected into the runner;
/// implementations must be safe for concurrent use. For every run the
/// runner calls `inc_running` exactly once at start and `dec_running`
/// exactly once at the end, on every exit path.
pub trait MetricsSink: Send + Sync {
    fn inc_running(&self, image: &str);
    fn dec_running(&self, image: &str);
    fn observe_run(&self, image: &str, outcome: RunOutcome, elapsed: Duration);
}

/// Metrics sink that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn inc_running(&self, _image: &str) {}
    fn dec_running(&self, _image: &str) {}
    fn observe_run(&self, _image: &str, _outcome: RunOutcome, _elapsed: Duration) {}
}
