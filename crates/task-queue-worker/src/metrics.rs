use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};

/// Prometheus metrics for the consumer
pub struct WorkerMetrics {
    pub registry: Registry,

    pub tasks_processed: IntCounter,
    pub tasks_failed: IntCounter,
    pub task_processing_duration: Histogram,
    pub queue_length: IntGauge,
    pub store_errors: IntCounter,
}

impl WorkerMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let tasks_processed = IntCounter::new(
            "worker_tasks_processed_total",
            "Total number of tasks processed",
        )?;
        registry.register(Box::new(tasks_processed.clone()))?;

        let tasks_failed = IntCounter::new(
            "worker_tasks_failed_total",
            "Total number of tasks that failed",
        )?;
        registry.register(Box::new(tasks_failed.clone()))?;

        let task_processing_duration = Histogram::with_opts(HistogramOpts::new(
            "worker_task_processing_duration_seconds",
            "Task processing duration",
        ))?;
        registry.register(Box::new(task_processing_duration.clone()))?;

        let queue_length = IntGauge::new("worker_queue_length", "Current length of task queue")?;
        registry.register(Box::new(queue_length.clone()))?;

        let store_errors = IntCounter::new(
            "worker_store_errors_total",
            "Store calls that failed during a tick",
        )?;
        registry.register(Box::new(store_errors.clone()))?;

        Ok(WorkerMetrics {
            registry,
            tasks_processed,
            tasks_failed,
            task_processing_duration,
            queue_length,
            store_errors,
        })
    }

    /// Render all metrics in the text exposition format
    pub fn encode(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
