//! Prometheus metrics for mirage.
//!
//! Tracks rule registration, matched and unmatched application traffic,
//! applied delays and history lookups.
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, register_int_gauge,
    CounterVec, Encoder, HistogramVec, IntCounter, IntGauge, TextEncoder,
};

lazy_static! {
    /// Application requests answered from a registered rule
    pub static ref REQUESTS_SERVED_TOTAL: CounterVec = register_counter_vec!(
        "mirage_requests_served_total",
        "Total number of application requests answered by a registered rule",
        &["request_type", "status"]
    )
    .unwrap();

    /// Application requests no rule accepted
    pub static ref REQUESTS_UNMATCHED_TOTAL: CounterVec = register_counter_vec!(
        "mirage_requests_unmatched_total",
        "Total number of application requests that matched no rule",
        &["method"]
    )
    .unwrap();

    /// Rule registrations by outcome
    pub static ref RULES_REGISTERED_TOTAL: CounterVec = register_counter_vec!(
        "mirage_rules_registered_total",
        "Total number of rule registrations",
        &["time_to_live", "result"]  // result: ok|rejected
    )
    .unwrap();

    /// Rules currently held by the registry
    pub static ref ACTIVE_RULES: IntGauge = register_int_gauge!(
        "mirage_active_rules",
        "Number of rules currently registered"
    )
    .unwrap();

    /// Delay applied before responding, in milliseconds
    pub static ref RESPONSE_DELAY_MS: HistogramVec = register_histogram_vec!(
        "mirage_response_delay_ms",
        "Histogram of configured response delays in milliseconds",
        &["request_type"],
        vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap();

    /// History lookups by outcome
    pub static ref HISTORY_LOOKUPS_TOTAL: CounterVec = register_counter_vec!(
        "mirage_history_lookups_total",
        "Total number of recorded request lookups",
        &["result"]  // result: found|absent
    )
    .unwrap();

    /// Reset operations
    pub static ref RESETS_TOTAL: IntCounter = register_int_counter!(
        "mirage_resets_total",
        "Total number of reset operations"
    )
    .unwrap();
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

pub fn record_served(request_type: &str, status: u16) {
    REQUESTS_SERVED_TOTAL
        .with_label_values(&[request_type, &status.to_string()])
        .inc();
}

pub fn record_unmatched(method: &str) {
    REQUESTS_UNMATCHED_TOTAL.with_label_values(&[method]).inc();
}

pub fn record_registration(time_to_live: &str, accepted: bool) {
    let result = if accepted { "ok" } else { "rejected" };
    RULES_REGISTERED_TOTAL
        .with_label_values(&[time_to_live, result])
        .inc();
}

pub fn set_active_rules(count: usize) {
    ACTIVE_RULES.set(i64::try_from(count).unwrap_or(i64::MAX));
}

pub fn record_delay(request_type: &str, delay_ms: u64) {
    RESPONSE_DELAY_MS
        .with_label_values(&[request_type])
        .observe(delay_ms as f64);
}

pub fn record_history_lookup(found: bool) {
    let result = if found { "found" } else { "absent" };
    HISTORY_LOOKUPS_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_reset() {
    RESETS_TOTAL.inc();
}
