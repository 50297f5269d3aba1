use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use argorun_model::S3ArtifactConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid image pattern {pattern:?}")]
    InvalidImagePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Runner configuration, usually read from the service's config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerConfig {
    /// Base URL of the workflow server.
    pub base_url: String,
    /// Bearer token used for every workflow-server call.
    pub access_token: String,
    /// Namespace the workflows are created in.
    pub execution_namespace: String,
    /// Service account used by the workflow pod, e.g. for artifact access.
    pub service_account_name: String,
    /// Service account used by the workflow executor. Needs get/watch/patch/
    /// list on pods and get/watch on pods/log.
    pub executor_service_account_name: String,
    /// Annotations appended to each workflow pod.
    #[serde(default)]
    pub workflow_pod_annotations: Option<IndexMap<String, String>>,
    /// Artifact repository shared by all runs.
    pub artifact_s3_config: S3ArtifactConfig,
    /// Patterns of container images this runner is willing to execute.
    #[serde(default)]
    pub allowed_images: Vec<String>,
}

impl RunnerConfig {
    /// Compile the allow-list once at construction.
    pub fn compile_allowed_images(&self) -> Result<Vec<Regex>, ConfigError> {
        self.allowed_images
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidImagePattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }
}
