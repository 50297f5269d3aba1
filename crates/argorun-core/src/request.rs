use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use argorun_model::CommandSpec;

use crate::error::RunError;
use crate::logger::TaskSink;

/// One container execution request. Immutable for the duration of a run.
///
/// `mount_dirs` maps host directories to container directories; iteration
/// order is preserved and determines artifact indexing. `env_vars` keeps
/// insertion order for the same reason.
#[derive(Clone)]
pub struct RunRequest {
    pub image: String,
    pub command: Option<CommandSpec>,
    pub args: Option<Vec<String>>,
    pub env_vars: Option<IndexMap<String, String>>,
    pub mount_dirs: Option<IndexMap<PathBuf, String>>,
    pub working_dir: Option<String>,
    /// Sink for the human-readable execution log shown to the requester.
    pub log_sink: Option<Arc<dyn TaskSink>>,
}

impl RunRequest {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            command: None,
            args: None,
            env_vars: None,
            mount_dirs: None,
            working_dir: None,
            log_sink: None,
        }
    }
}

impl fmt::Debug for RunRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunRequest")
            .field("image", &self.image)
            .field("command", &self.command)
            .field("args", &self.args)
            .field("env_vars", &self.env_vars)
            .field("mount_dirs", &self.mount_dirs)
            .field("working_dir", &self.working_dir)
            .field("log_sink", &self.log_sink.is_some())
            .finish()
    }
}

/// Executes one container run end to end and returns once the job reached a
/// terminal state. Safe to call concurrently for independent runs.
#[async_trait]
pub trait ContainerRunner: Send + Sync {
    async fn run_container(&self, request: RunRequest) -> Result<(), RunError>;
}
