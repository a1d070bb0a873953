use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};

pub static LLM_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "research_llm_calls_total",
        "Structured model calls by schema and outcome",
        &["schema", "outcome"]
    )
    .expect("llm call counter registers once")
});

pub static SEARCH_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "research_search_calls_total",
        "Web searches by provider and outcome",
        &["provider", "outcome"]
    )
    .expect("search counter registers once")
});

pub static REPORTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "research_reports_total",
        "Report generation runs by outcome",
        &["outcome"]
    )
    .expect("report counter registers once")
});

pub static REPORT_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "research_report_duration_seconds",
        "Wall time of a full report generation run",
        vec![5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]
    )
    .expect("report duration histogram registers once")
});

/// Renders every registered metric in the prometheus text format.
pub fn render() -> (Vec<u8>, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    (buffer, encoder.format_type().to_string())
}
