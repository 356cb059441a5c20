use metrics_exporter_prometheus::PrometheusHandle;
use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static DECISIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static BLOCKS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static FALLBACKS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Register decision counters and the HTTP recorder. Safe to call twice.
pub fn init_metrics() {
    if PROMETHEUS_REGISTRY.get().is_some() {
        return;
    }

    match service_core::middleware::metrics::install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!(error = %e, "HTTP metrics recorder not installed"),
    }

    let registry = Registry::new();

    let decisions = counter_vec(
        "login_risk_decisions_total",
        "Hook decisions by event type and outcome",
        &["event_type", "decision"],
    );
    let blocks = counter_vec(
        "login_risk_blocks_total",
        "Account block attempts after declined registrations",
        &["outcome"],
    );
    let fallbacks = counter_vec(
        "login_risk_fallbacks_total",
        "Decisions taken from the failure policy instead of a verdict",
        &["event_type"],
    );

    for collector in [&decisions, &blocks, &fallbacks] {
        if let Err(e) = registry.register(Box::new(collector.clone())) {
            tracing::warn!(error = %e, "Failed to register hook metric");
        }
    }

    let _ = PROMETHEUS_REGISTRY.set(registry);
    let _ = DECISIONS_TOTAL.set(decisions);
    let _ = BLOCKS_TOTAL.set(blocks);
    let _ = FALLBACKS_TOTAL.set(fallbacks);
}

fn counter_vec(name: &str, help: &str, labels: &[&str]) -> IntCounterVec {
    // Names and labels are static and valid, construction cannot fail.
    IntCounterVec::new(Opts::new(name, help), labels).expect("static metric definition")
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

pub fn record_decision(event_type: &str, decision: &str) {
    if let Some(counter) = DECISIONS_TOTAL.get() {
        counter.with_label_values(&[event_type, decision]).inc();
    }
}

pub fn record_block(outcome: &str) {
    if let Some(counter) = BLOCKS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn record_fallback(event_type: &str) {
    if let Some(counter) = FALLBACKS_TOTAL.get() {
        counter.with_label_values(&[event_type]).inc();
    }
}
