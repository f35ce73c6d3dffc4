use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Once;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Upstream metrics
    pub static ref UPSTREAM_ATTEMPTS: IntCounter = IntCounter::new(
        "upstream_attempts_total",
        "Total number of upstream request attempts"
    ).expect("valid metric definition");

    pub static ref UPSTREAM_FAILURES: IntCounter = IntCounter::new(
        "upstream_failures_total",
        "Total number of failed upstream request attempts"
    ).expect("valid metric definition");

    pub static ref RATE_LIMIT_REJECTIONS: IntCounter = IntCounter::new(
        "rate_limit_rejections_total",
        "Requests rejected by the local rate limiter"
    ).expect("valid metric definition");

    // Fan-out metrics
    pub static ref FANOUT_BATCHES: IntCounter = IntCounter::new(
        "fanout_batches_total",
        "Total number of batches dispatched by fan-out calls"
    ).expect("valid metric definition");

    // Gateway metrics
    pub static ref GATEWAY_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("gateway_requests_total", "Gateway requests by response status"),
        &["status"]
    ).expect("valid metric definition");

    pub static ref GATEWAY_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "gateway_latency_seconds",
            "Time spent building the top list"
        ).buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])
    ).expect("valid metric definition");
}

static REGISTER: Once = Once::new();

pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(UPSTREAM_ATTEMPTS.clone()),
            Box::new(UPSTREAM_FAILURES.clone()),
            Box::new(RATE_LIMIT_REJECTIONS.clone()),
            Box::new(FANOUT_BATCHES.clone()),
            Box::new(GATEWAY_REQUESTS.clone()),
            Box::new(GATEWAY_LATENCY.clone()),
        ];
        for collector in collectors {
            if let Err(e) = REGISTRY.register(collector) {
                tracing::warn!("Metric registration failed: {}", e);
            }
        }
    });
}

/// Text exposition of everything in [`REGISTRY`].
pub fn render() -> String {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Metric encoding failed: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
