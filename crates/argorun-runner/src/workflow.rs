use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use argorun_core::{RunError, RunRequest, TaskLogger};
use argorun_model::{
    Artifact, Artifacts, ContainerSpec, EnvVar, ExecutorSpec, FolderBinding, ResourceList,
    Resources, S3Artifact, SecurityContext, Template, TemplateMeta, TtlStrategy, Workflow,
    WorkflowManifest, WorkflowMeta, WorkflowSpec, WorkflowStatus,
};

use crate::config::RunnerConfig;
use crate::events::WorkflowEvents;

const GENERATE_NAME: &str = "container-runner-";
const RUN_TEMPLATE: &str = "run";
const ACTIVE_DEADLINE_SECONDS: u64 = 15 * 60;
const TTL_AFTER_COMPLETION_SECONDS: u64 = 60;
const TTL_AFTER_SUCCESS_SECONDS: u64 = 60;
const TTL_AFTER_FAILURE_SECONDS: u64 = 24 * 60 * 60;
const RUN_AS_ID: u32 = 1001;
const INPUT_ARTIFACT_MODE: u32 = 0o777;
const MEMORY_REQUEST: &str = "512Mi";
const MEMORY_LIMIT: &str = "1.5Gi";

#[derive(Debug, Deserialize)]
struct CreatedWorkflow {
    metadata: CreatedMeta,
}

#[derive(Debug, Deserialize)]
struct CreatedMeta {
    name: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: WorkflowStatus,
}

/// Submits workflows to the server and waits for their terminal phase.
pub struct WorkflowRunner {
    http: reqwest::Client,
    config: Arc<RunnerConfig>,
    events: WorkflowEvents,
}

impl WorkflowRunner {
    pub fn new(config: Arc<RunnerConfig>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config: config.clone(),
            events: WorkflowEvents::new(config),
        }
    }

    /// Build the one-template manifest for a run.
    pub fn build_manifest(
        &self,
        request: &RunRequest,
        bindings: &[FolderBinding],
    ) -> WorkflowManifest {
        let config = &self.config;

        let inputs = bindings
            .iter()
            .enumerate()
            .map(|(index, binding)| Artifact {
                name: format!("input-{index}"),
                path: binding.container_directory.clone(),
                // world-writable so the container user can produce outputs
                mode: Some(INPUT_ARTIFACT_MODE),
                recurse_mode: Some(true),
                s3: S3Artifact {
                    config: config.artifact_s3_config.clone(),
                    key: binding.input_key.clone(),
                },
            })
            .collect();

        let outputs = bindings
            .iter()
            .enumerate()
            .map(|(index, binding)| Artifact {
                name: format!("output-{index}"),
                path: binding.container_directory.clone(),
                mode: None,
                recurse_mode: None,
                s3: S3Artifact {
                    config: config.artifact_s3_config.clone(),
                    key: binding.output_key.clone(),
                },
            })
            .collect();

        let env = request.env_vars.as_ref().map(|vars| {
            vars.iter()
                .map(|(name, value)| EnvVar {
                    name: name.clone(),
                    value: value.clone(),
                })
                .collect()
        });

        WorkflowManifest {
            workflow: Workflow {
                api_version: "argoproj.io/v1alpha1".into(),
                kind: "Workflow".into(),
                metadata: WorkflowMeta {
                    generate_name: GENERATE_NAME.into(),
                },
                spec: WorkflowSpec {
                    active_deadline_seconds: ACTIVE_DEADLINE_SECONDS,
                    automount_service_account_token: false,
                    service_account_name: config.service_account_name.clone(),
                    executor: ExecutorSpec {
                        service_account_name: config.executor_service_account_name.clone(),
                    },
                    ttl_strategy: TtlStrategy {
                        seconds_after_completion: TTL_AFTER_COMPLETION_SECONDS,
                        seconds_after_success: TTL_AFTER_SUCCESS_SECONDS,
                        seconds_after_failure: TTL_AFTER_FAILURE_SECONDS,
                    },
                    entrypoint: RUN_TEMPLATE.into(),
                    templates: vec![Template {
                        name: RUN_TEMPLATE.into(),
                        metadata: TemplateMeta {
                            annotations: config.workflow_pod_annotations.clone(),
                        },
                        inputs: Artifacts { artifacts: inputs },
                        container: ContainerSpec {
                            image: request.image.clone(),
                            working_dir: request.working_dir.clone(),
                            command: request.command.as_ref().map(|command| command.to_argv()),
                            args: request.args.clone(),
                            env,
                            security_context: SecurityContext {
                                run_as_non_root: true,
                                run_as_user: RUN_AS_ID,
                                run_as_group: RUN_AS_ID,
                            },
                            resources: Resources {
                                requests: ResourceList {
                                    memory: MEMORY_REQUEST.into(),
                                },
                                limits: ResourceList {
                                    memory: MEMORY_LIMIT.into(),
                                },
                            },
                        },
                        outputs: Artifacts { artifacts: outputs },
                    }],
                },
            },
        }
    }

    /// Submit the workflow for `request`, stream its progress and wait for
    /// completion, then verify it finished in the `Succeeded` phase.
    ///
    /// Server error bodies may quote the manifest, so they are logged here
    /// and never included in the returned error.
    pub async fn run_workflow(
        &self,
        request: &RunRequest,
        bindings: &[FolderBinding],
        task: &TaskLogger,
    ) -> Result<(), RunError> {
        let manifest = self.build_manifest(request, bindings);
        let config = &self.config;

        let response = self
            .http
            .post(format!(
                "{}/api/v1/workflows/{}",
                config.base_url, config.execution_namespace
            ))
            .bearer_auth(&config.access_token)
            .json(&manifest)
            .send()
            .await
            .map_err(|err| {
                warn!(target: "argorun.workflow", "workflow creation request failed: {err}");
                RunError::Submission
            })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(
                target: "argorun.workflow",
                %status,
                "workflow creation rejected: {body}"
            );
            return Err(RunError::Submission);
        }
        let created: CreatedWorkflow = response.json().await.map_err(|err| {
            warn!(target: "argorun.workflow", "workflow creation response unreadable: {err}");
            RunError::Submission
        })?;
        let name = created.metadata.name;
        task.info(&format!("created worker task with name {name}, waiting for logs"));

        self.events.log_progress_and_wait(&name, task).await?;

        let response = self
            .http
            .get(format!(
                "{}/api/v1/workflows/{}/{}",
                config.base_url, config.execution_namespace, name
            ))
            .query(&[("fields", "status.phase,status.message")])
            .bearer_auth(&config.access_token)
            .send()
            .await
            .map_err(|err| {
                warn!(target: "argorun.workflow", "workflow status request failed: {err}");
                RunError::StatusFetch
            })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(
                target: "argorun.workflow",
                %status,
                "workflow status rejected: {body}"
            );
            return Err(RunError::StatusFetch);
        }
        let finished: StatusResponse = response.json().await.map_err(|err| {
            warn!(target: "argorun.workflow", "workflow status response unreadable: {err}");
            RunError::StatusFetch
        })?;

        let status = finished.status;
        if !status.succeeded() {
            return Err(RunError::JobFailed {
                phase: status.phase().to_string(),
                message: status.message().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use indexmap::IndexMap;

    use argorun_model::{CommandSpec, S3ArtifactConfig};

    use super::*;

    fn config() -> Arc<RunnerConfig> {
        Arc::new(RunnerConfig {
            base_url: "https://argo.local".into(),
            access_token: "<TOKEN>".into(),
            execution_namespace: "argo-workflows".into(),
            service_account_name: "service-account-2".into(),
            executor_service_account_name: "service-account".into(),
            workflow_pod_annotations: Some(IndexMap::from([(
                "example.org/team".to_string(),
                "runners".to_string(),
            )])),
            artifact_s3_config: S3ArtifactConfig {
                bucket: "my-bucket".into(),
                endpoint: "s3.local".into(),
                use_sdk_creds: true,
            },
            allowed_images: vec!["^my-image$".into()],
        })
    }

    fn request() -> RunRequest {
        let mut request = RunRequest::new("my-image");
        request.command = Some(CommandSpec::Line("start.sh".into()));
        request.args = Some(vec!["--verbose".into()]);
        request.working_dir = Some("/work".into());
        request.env_vars = Some(IndexMap::from([
            ("FIRST".to_string(), "1".to_string()),
            ("SECOND".to_string(), "two".to_string()),
        ]));
        request
    }

    fn bindings() -> Vec<FolderBinding> {
        vec![FolderBinding {
            host_directory: PathBuf::from("/tmp/host"),
            container_directory: "/work".into(),
            input_key: "container-runner-abc/input-0.tar.gz".into(),
            output_key: "container-runner-abc/output-0.tar.gz".into(),
        }]
    }

    #[test]
    fn manifest_matches_the_server_contract() {
        let runner = WorkflowRunner::new(config());
        let manifest = runner.build_manifest(&request(), &bindings());

        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "workflow": {
                    "apiVersion": "argoproj.io/v1alpha1",
                    "kind": "Workflow",
                    "metadata": { "generateName": "container-runner-" },
                    "spec": {
                        "activeDeadlineSeconds": 900,
                        "automountServiceAccountToken": false,
                        "serviceAccountName": "service-account-2",
                        "executor": { "serviceAccountName": "service-account" },
                        "ttlStrategy": {
                            "secondsAfterCompletion": 60,
                            "secondsAfterSuccess": 60,
                            "secondsAfterFailure": 86400,
                        },
                        "entrypoint": "run",
                        "templates": [{
                            "name": "run",
                            "metadata": {
                                "annotations": { "example.org/team": "runners" },
                            },
                            "inputs": {
                                "artifacts": [{
                                    "name": "input-0",
                                    "path": "/work",
                                    "mode": 511,
                                    "recurseMode": true,
                                    "s3": {
                                        "bucket": "my-bucket",
                                        "endpoint": "s3.local",
                                        "useSDKCreds": true,
                                        "key": "container-runner-abc/input-0.tar.gz",
                                    },
                                }],
                            },
                            "container": {
                                "image": "my-image",
                                "workingDir": "/work",
                                "command": ["start.sh"],
                                "args": ["--verbose"],
                                "env": [
                                    { "name": "FIRST", "value": "1" },
                                    { "name": "SECOND", "value": "two" },
                                ],
                                "securityContext": {
                                    "runAsNonRoot": true,
                                    "runAsUser": 1001,
                                    "runAsGroup": 1001,
                                },
                                "resources": {
                                    "requests": { "memory": "512Mi" },
                                    "limits": { "memory": "1.5Gi" },
                                },
                            },
                            "outputs": {
                                "artifacts": [{
                                    "name": "output-0",
                                    "path": "/work",
                                    "s3": {
                                        "bucket": "my-bucket",
                                        "endpoint": "s3.local",
                                        "useSDKCreds": true,
                                        "key": "container-runner-abc/output-0.tar.gz",
                                    },
                                }],
                            },
                        }],
                    },
                }
            })
        );
    }

    #[test]
    fn bare_requests_leave_optional_fields_out() {
        let mut config = config().as_ref().clone();
        config.workflow_pod_annotations = None;
        let runner = WorkflowRunner::new(Arc::new(config));

        let request = RunRequest::new("my-image");
        let manifest = runner.build_manifest(&request, &[]);
        let value = serde_json::to_value(&manifest).unwrap();

        let template = &value["workflow"]["spec"]["templates"][0];
        let container = template["container"].as_object().unwrap();
        assert!(!container.contains_key("command"));
        assert!(!container.contains_key("args"));
        assert!(!container.contains_key("env"));
        assert!(!container.contains_key("workingDir"));
        assert_eq!(template["metadata"], serde_json::json!({}));
        assert_eq!(template["inputs"]["artifacts"], serde_json::json!([]));
        assert_eq!(template["outputs"]["artifacts"], serde_json::json!([]));
    }

    #[test]
    fn argv_commands_pass_through_unchanged() {
        let runner = WorkflowRunner::new(config());
        let mut request = RunRequest::new("my-image");
        request.command = Some(CommandSpec::Argv(vec!["sh".into(), "-c".into()]));

        let manifest = runner.build_manifest(&request, &[]);
        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(
            value["workflow"]["spec"]["templates"][0]["container"]["command"],
            serde_json::json!(["sh", "-c"])
        );
    }
}
