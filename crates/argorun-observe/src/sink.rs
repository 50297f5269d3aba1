use argorun_core::{LogLevel, TaskSink};

/// Task sink that forwards run output into the process `tracing` pipeline.
///
/// Useful for services that have no dedicated per-run log channel and want
/// execution output interleaved with their own diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TaskSink for TracingSink {
    fn line(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "argorun.run", "{message}"),
            LogLevel::Info => tracing::info!(target: "argorun.run", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "argorun.run", "{message}"),
            LogLevel::Error => tracing::error!(target: "argorun.run", "{message}"),
        }
    }
}
