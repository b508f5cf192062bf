//! Metrics collection for observability

use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry, Counter, CounterVec, HistogramVec, Opts, Registry,
};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector for store operations
pub struct Metrics {
    registry: Registry,

    pub store_requests: CounterVec,
    pub store_duplicates: Counter,
    pub store_fallbacks: CounterVec,
    pub store_request_duration: HistogramVec,
}

impl Metrics {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let store_requests = register_counter_vec_with_registry!(
            Opts::new("fabric_store_requests_total", "Total store operations"),
            &["operation", "status"],
            registry
        )?;

        let store_duplicates = register_counter_with_registry!(
            Opts::new("fabric_store_duplicates_total", "Total rejected duplicate inserts"),
            registry
        )?;

        let store_fallbacks = register_counter_vec_with_registry!(
            Opts::new(
                "fabric_store_fallbacks_total",
                "Operations emulated because the backend lacks the capability"
            ),
            &["operation"],
            registry
        )?;

        let store_request_duration = register_histogram_vec_with_registry!(
            "fabric_store_request_duration_seconds",
            "Store operation duration in seconds",
            &["operation"],
            registry
        )?;

        Ok(Self {
            registry,
            store_requests,
            store_duplicates,
            store_fallbacks,
            store_request_duration,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record the outcome of a store operation
    pub fn record_operation(&self, operation: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.store_requests
            .with_label_values(&[operation, status])
            .inc();
    }

    /// Record a rejected duplicate insert
    pub fn record_duplicate(&self) {
        self.store_duplicates.inc();
    }

    /// Record an operation served by the facade's fallback path
    pub fn record_fallback(&self, operation: &str) {
        self.store_fallbacks.with_label_values(&[operation]).inc();
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Helper macro to time operations
#[macro_export]
macro_rules! time_operation {
    ($histogram:expr, $label:expr, $operation:expr) => {{
        let timer = $histogram.with_label_values(&[$label]).start_timer();
        let result = $operation;
        timer.observe_duration();
        result
    }};
}
