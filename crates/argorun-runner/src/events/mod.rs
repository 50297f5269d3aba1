use std::sync::Arc;

use argorun_core::{RunError, TaskLogger};

use crate::config::RunnerConfig;

mod logs;
mod pods;
mod sse;

use logs::LogFeed;
use pods::EventFeed;

/// Coordinates the two streaming subscriptions of one workflow run: the
/// pod-event stream and the container log stream.
pub struct WorkflowEvents {
    events: EventFeed,
    logs: LogFeed,
}

impl WorkflowEvents {
    pub fn new(config: Arc<RunnerConfig>) -> Self {
        let http = reqwest::Client::new();
        Self {
            events: EventFeed::new(http.clone(), config.clone()),
            logs: LogFeed::new(http, config),
        }
    }

    /// Stream pod events and container logs for `name` until the workflow's
    /// pod terminates. The event subscription runs in the background and is
    /// closed on every exit path, including a failing log stream.
    pub async fn log_progress_and_wait(
        &self,
        name: &str,
        task: &TaskLogger,
    ) -> Result<(), RunError> {
        let subscription = self.events.subscribe(name, task.clone());
        let result = self.logs.follow(name, task).await;
        subscription.stop().await;
        result
    }
}
