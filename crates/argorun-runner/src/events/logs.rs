use std::sync::Arc;

use futures_util::StreamExt;
use serde::Deserialize;
use tracing::debug;

use argorun_core::{RunError, TaskLogger};

use super::sse::{Envelope, SseDecoder};
use crate::config::RunnerConfig;

#[derive(Debug, Deserialize)]
struct LogLine {
    #[serde(default)]
    content: Option<String>,
}

/// Follows the main container's log stream of a single workflow.
pub(crate) struct LogFeed {
    http: reqwest::Client,
    config: Arc<RunnerConfig>,
}

impl LogFeed {
    pub fn new(http: reqwest::Client, config: Arc<RunnerConfig>) -> Self {
        Self { http, config }
    }

    /// Stream the container logs for `name`, forwarding each line to `task`.
    ///
    /// The server keeps the stream open while the pod runs and drops it when
    /// the pod terminates, so the stream ending is the completion signal and
    /// never an error. Only failing to open the stream is reported.
    pub async fn follow(&self, name: &str, task: &TaskLogger) -> Result<(), RunError> {
        let response = self
            .http
            .get(format!(
                "{}/api/v1/workflows/{}/{}/log",
                self.config.base_url, self.config.execution_namespace, name
            ))
            .query(&[("logOptions.container", "main"), ("logOptions.follow", "true")])
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|err| RunError::LogStream(err.to_string()))?;

        if !response.status().is_success() {
            return Err(RunError::LogStream(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let mut decoder = SseDecoder::default();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(err) => {
                    // transport drop mid-stream means the pod is gone
                    debug!(target: "argorun.logs", "log stream closed: {err}");
                    break;
                }
            };
            for payload in decoder.push(&bytes) {
                let Ok(envelope) = serde_json::from_str::<Envelope<LogLine>>(&payload) else {
                    continue;
                };
                if let Some(line) = envelope.result
                    && let Some(content) = line.content
                    && !content.is_empty()
                {
                    task.info(&content);
                }
            }
        }
        Ok(())
    }
}
