use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use regex::Regex;
use tracing::warn;

use argorun_core::{
    ContainerRunner, MetricsSink, ObjectStore, RunError, RunOutcome, RunRequest, TaskLogger,
};
use argorun_model::FolderBinding;

use crate::artifacts::ArtifactStore;
use crate::config::{ConfigError, RunnerConfig};
use crate::workflow::WorkflowRunner;

/// Container runner executing requests as workflows on a remote engine.
pub struct ArgoContainerRunner {
    allowed_images: Vec<Regex>,
    artifacts: ArtifactStore,
    workflow: WorkflowRunner,
    metrics: Arc<dyn MetricsSink>,
}

impl ArgoContainerRunner {
    pub fn from_config(
        config: RunnerConfig,
        store: Arc<dyn ObjectStore>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<Self, ConfigError> {
        let allowed_images = config.compile_allowed_images()?;
        let bucket = config.artifact_s3_config.bucket.clone();
        let config = Arc::new(config);
        Ok(Self {
            allowed_images,
            artifacts: ArtifactStore::new(store, bucket),
            workflow: WorkflowRunner::new(config),
            metrics,
        })
    }

    fn image_allowed(&self, image: &str) -> bool {
        self.allowed_images.iter().any(|pattern| pattern.is_match(image))
    }

    async fn execute(
        &self,
        request: &RunRequest,
        work_dir: &str,
        bindings: &[FolderBinding],
        task: &TaskLogger,
    ) -> Result<(), RunError> {
        task.info(&format!("uploading artifacts to {work_dir}"));
        self.artifacts.upload(bindings).await?;

        task.info("executing the workflow");
        self.workflow.run_workflow(request, bindings, task).await?;

        task.info(&format!("downloading artifacts from {work_dir}"));
        self.artifacts.download(bindings).await?;

        task.info("execution finished");
        Ok(())
    }
}

#[async_trait]
impl ContainerRunner for ArgoContainerRunner {
    async fn run_container(&self, request: RunRequest) -> Result<(), RunError> {
        if !self.image_allowed(&request.image) {
            return Err(RunError::ImageNotAllowed {
                image: request.image,
            });
        }

        let task = TaskLogger::new(request.log_sink.clone());
        let mounts = request.mount_dirs.clone().unwrap_or_default();
        let (work_dir, bindings) = self.artifacts.calculate_bindings(&mounts);

        let started = Instant::now();
        self.metrics.inc_running(&request.image);

        let outcome = self.execute(&request, &work_dir, &bindings, &task).await;
        let status = if outcome.is_ok() {
            RunOutcome::Success
        } else {
            RunOutcome::Failure
        };
        self.metrics.observe_run(&request.image, status, started.elapsed());

        // artifacts are removed no matter how the run ended
        task.info("cleaning up the artifacts");
        let cleanup = self.artifacts.delete(&bindings).await;
        self.metrics.dec_running(&request.image);

        match (outcome, cleanup) {
            (Err(run_err), Err(cleanup_err)) => {
                warn!(
                    target: "argorun.runner",
                    "artifact cleanup failed after a failed run: {cleanup_err}"
                );
                Err(run_err)
            }
            (Err(run_err), Ok(())) => Err(run_err),
            (Ok(()), Err(cleanup_err)) => Err(cleanup_err),
            (Ok(()), Ok(())) => Ok(()),
        }
    }
}
