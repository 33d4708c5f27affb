use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{CounterVec, IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static DOCUMENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static REVENUE_TOTAL: OnceLock<CounterVec> = OnceLock::new();

pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if METRICS_HANDLE.set(handle).is_err() {
        panic!("failed to set metrics handle: already initialized");
    }

    let registry = Registry::new();

    let documents_counter = IntCounterVec::new(
        Opts::new(
            "ops_documents_total",
            "Lifecycle operations by entity and action",
        ),
        &["entity", "action"],
    )
    .expect("Failed to create ops_documents_total metric");

    let revenue_counter = CounterVec::new(
        Opts::new("ops_revenue_total", "Payment amounts recorded"),
        &["method"],
    )
    .expect("Failed to create ops_revenue_total metric");

    registry
        .register(Box::new(documents_counter.clone()))
        .expect("Failed to register ops_documents_total");
    registry
        .register(Box::new(revenue_counter.clone()))
        .expect("Failed to register ops_revenue_total");

    PROMETHEUS_REGISTRY
        .set(registry)
        .expect("Failed to set prometheus registry");
    DOCUMENTS_TOTAL
        .set(documents_counter)
        .expect("Failed to set ops_documents_total");
    REVENUE_TOTAL
        .set(revenue_counter)
        .expect("Failed to set ops_revenue_total");
}

pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

/// Record a lifecycle operation (e.g. `quotation`/`accepted`).
pub fn record_document(entity: &str, action: &str) {
    if let Some(counter) = DOCUMENTS_TOTAL.get() {
        counter.with_label_values(&[entity, action]).inc();
    }
}

/// Record a received payment amount.
pub fn record_revenue(method: &str, amount: f64) {
    if let Some(counter) = REVENUE_TOTAL.get() {
        counter.with_label_values(&[method]).inc_by(amount);
    }
}
