//! Remote container execution on an Argo-style workflow engine.
//!
//! A [`RunRequest`](argorun_core::RunRequest) is turned into a one-template
//! workflow manifest; the mounted host directories travel through object
//! storage as gzip'd tar archives. The runner submits the manifest, streams
//! pod events and container logs back to the caller's task sink, and returns
//! once the workflow reached a terminal phase, cleaning up the run's
//! artifacts on every exit path.

mod artifacts;
mod config;
mod events;
mod runner;
mod workflow;

pub use artifacts::{ArtifactStore, TMP_MARKER_DIR};
pub use config::{ConfigError, RunnerConfig};
pub use events::WorkflowEvents;
pub use runner::ArgoContainerRunner;
pub use workflow::WorkflowRunner;
