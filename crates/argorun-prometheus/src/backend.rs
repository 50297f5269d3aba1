use std::time::Duration;

use prometheus::{
    HistogramOpts, HistogramVec, IntGaugeVec, Opts, Registry, exponential_buckets,
};

use argorun_core::{MetricsSink, RunOutcome};

/// Prometheus-backed run metrics.
///
/// Cloning is cheap and shares the underlying collectors.
#[derive(Clone)]
pub struct RunnerMetrics {
    registry: Registry,
    execution_seconds: HistogramVec,
    running_jobs: IntGaugeVec,
}

impl RunnerMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Register the collectors on an existing registry.
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let execution_seconds = HistogramVec::new(
            HistogramOpts::new(
                "argorun_container_runner_execution_seconds",
                "Duration of remote container executions",
            )
            .buckets(exponential_buckets(1.0, 2.0, 10)?),
            &["image", "status"],
        )?;
        let running_jobs = IntGaugeVec::new(
            Opts::new(
                "argorun_container_runner_running_jobs",
                "Number of currently running container executions",
            ),
            &["image"],
        )?;

        registry.register(Box::new(execution_seconds.clone()))?;
        registry.register(Box::new(running_jobs.clone()))?;

        Ok(Self {
            registry,
            execution_seconds,
            running_jobs,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }
}

impl MetricsSink for RunnerMetrics {
    fn inc_running(&self, image: &str) {
        self.running_jobs.with_label_values(&[image]).inc();
    }

    fn dec_running(&self, image: &str) {
        self.running_jobs.with_label_values(&[image]).dec();
    }

    fn observe_run(&self, image: &str, outcome: RunOutcome, elapsed: Duration) {
        self.execution_seconds
            .with_label_values(&[image, outcome.as_str()])
            .observe(elapsed.as_secs_f64());
    }
}
