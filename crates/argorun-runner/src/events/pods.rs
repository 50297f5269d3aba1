use std::sync::Arc;

use futures_util::StreamExt;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use argorun_core::TaskLogger;

use super::sse::{Envelope, SseDecoder};
use crate::config::RunnerConfig;

/// Kubernetes event attached to the workflow's pod.
#[derive(Debug, Deserialize)]
pub(crate) struct PodEvent {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Follows the pod-event stream of a single workflow in the background.
pub(crate) struct EventFeed {
    http: reqwest::Client,
    config: Arc<RunnerConfig>,
}

impl EventFeed {
    pub fn new(http: reqwest::Client, config: Arc<RunnerConfig>) -> Self {
        Self { http, config }
    }

    /// Open the event stream for the pod behind `name` and forward each
    /// event to `task` until the subscription is stopped or the server
    /// closes the stream.
    pub fn subscribe(&self, name: &str, task: TaskLogger) -> EventSubscription {
        let request = self
            .http
            .get(format!(
                "{}/api/v1/stream/events/{}",
                self.config.base_url, self.config.execution_namespace
            ))
            .query(&[(
                "listOptions.fieldSelector",
                format!("involvedObject.kind=Pod,involvedObject.name={name}"),
            )])
            .bearer_auth(&self.config.access_token);

        let token = CancellationToken::new();
        let stream_token = token.clone();
        let handle = tokio::spawn(async move {
            // the connect itself must also be abortable: a server that
            // accepts but never answers would otherwise pin this task past
            // the end of the run
            let sent = tokio::select! {
                _ = stream_token.cancelled() => return,
                sent = request.send() => sent,
            };
            let response = match sent {
                Ok(response) if response.status().is_success() => response,
                Ok(response) => {
                    warn!(
                        target: "argorun.events",
                        status = %response.status(),
                        "pod event stream rejected"
                    );
                    return;
                }
                Err(err) => {
                    warn!(target: "argorun.events", "pod event stream failed to open: {err}");
                    return;
                }
            };

            let mut decoder = SseDecoder::default();
            let mut chunks = response.bytes_stream();
            loop {
                tokio::select! {
                    _ = stream_token.cancelled() => break,
                    chunk = chunks.next() => match chunk {
                        Some(Ok(bytes)) => {
                            for payload in decoder.push(&bytes) {
                                forward_payload(&payload, &task);
                            }
                        }
                        Some(Err(err)) => {
                            debug!(target: "argorun.events", "pod event stream closed: {err}");
                            break;
                        }
                        None => break,
                    },
                }
            }
        });

        EventSubscription { token, handle }
    }
}

fn forward_payload(payload: &str, task: &TaskLogger) {
    let Ok(envelope) = serde_json::from_str::<Envelope<PodEvent>>(payload) else {
        return;
    };
    // keep-alive frames carry no event
    if let Some(event) = envelope.result {
        log_event(&event, task);
    }
}

/// Normal events are routine scheduling noise and Warning events usually
/// explain a failing run, so they map to debug and warn. Anything else is
/// surfaced verbatim with its type and reason.
pub(crate) fn log_event(event: &PodEvent, task: &TaskLogger) {
    let message = event.message.as_deref().unwrap_or_default();
    match event.kind.as_deref() {
        Some("Normal") => task.debug(message),
        Some("Warning") => task.warn(message),
        _ => {
            let kind = event.kind.as_deref().unwrap_or("Unknown");
            let reason = event.reason.as_deref().unwrap_or_default();
            task.info(&format!("{kind}: ({reason}) \"{message}\""));
        }
    }
}

/// Handle for one open pod-event subscription.
pub(crate) struct EventSubscription {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl EventSubscription {
    /// Ask the background task to close the stream. Calling this more than
    /// once has no further effect.
    #[allow(dead_code)]
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Close the stream and wait for the background task to finish.
    pub async fn stop(self) {
        self.token.cancel();
        let _ = self.handle.await;
    }
}
