mod binding;
mod command;
mod manifest;
mod status;

pub use binding::FolderBinding;
pub use command::CommandSpec;
pub use manifest::{
    Artifact, Artifacts, ContainerSpec, EnvVar, ExecutorSpec, ResourceList, Resources,
    S3Artifact, S3ArtifactConfig, SecurityContext, Template, TemplateMeta, TtlStrategy,
    Workflow, WorkflowManifest, WorkflowMeta, WorkflowSpec,
};
pub use status::WorkflowStatus;
