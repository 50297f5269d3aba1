mod error;
mod logger;
mod metrics;
mod request;
mod store;

pub use error::{RunError, StoreError};
pub use logger::{LogLevel, TaskLogger, TaskSink};
pub use metrics::{MetricsSink, NoopMetrics, RunOutcome};
pub use request::{ContainerRunner, RunRequest};
pub use store::ObjectStore;
