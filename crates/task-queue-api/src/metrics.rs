use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Prometheus metrics for the producer API
pub struct ApiMetrics {
    pub registry: Registry,

    pub http_requests_total: IntCounterVec,
    pub http_request_duration: HistogramVec,
    pub tasks_created: IntCounter,
}

impl ApiMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("api_http_requests_total", "Total number of HTTP requests"),
            &["method", "endpoint", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration = HistogramVec::new(
            HistogramOpts::new("api_http_request_duration_seconds", "HTTP request latency"),
            &["method", "endpoint"],
        )?;
        registry.register(Box::new(http_request_duration.clone()))?;

        let tasks_created = IntCounter::new("api_tasks_created_total", "Total number of tasks created")?;
        registry.register(Box::new(tasks_created.clone()))?;

        Ok(ApiMetrics {
            registry,
            http_requests_total,
            http_request_duration,
            tasks_created,
        })
    }

    /// Record one served request
    pub fn observe_request(&self, method: &str, endpoint: &str, status: u16, duration_secs: f64) {
        self.http_request_duration
            .with_label_values(&[method, endpoint])
            .observe(duration_secs);
        self.http_requests_total
            .with_label_values(&[method, endpoint, &status.to_string()])
            .inc();
    }

    /// Render all metrics in the text exposition format
    pub fn encode(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
