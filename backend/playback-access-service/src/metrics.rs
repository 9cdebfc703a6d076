use std::time::Duration;

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, TextEncoder};

static ACCESS_DECISIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "playback_access_decisions_total",
            "Authorization outcomes by result",
        ),
        &["outcome"],
    )
    .expect("failed to create playback_access_decisions_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register playback_access_decisions_total");
    counter
});

static METADATA_LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "playback_access_metadata_lookups_total",
            "Video metadata lookups by source",
        ),
        &["source"],
    )
    .expect("failed to create playback_access_metadata_lookups_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register playback_access_metadata_lookups_total");
    counter
});

static REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "playback_access_request_duration_seconds",
            "End-to-end latency of access requests",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
        ]),
        &["status"],
    )
    .expect("failed to create playback_access_request_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register playback_access_request_duration_seconds");
    histogram
});

/// `outcome`: public, authorized, denied, not_found, bad_request, error
pub fn observe_decision(outcome: &str) {
    ACCESS_DECISIONS_TOTAL.with_label_values(&[outcome]).inc();
}

/// `source`: cache_hit, cache_miss, not_found
pub fn observe_metadata_lookup(source: &str) {
    METADATA_LOOKUPS_TOTAL.with_label_values(&[source]).inc();
}

pub fn observe_request(status: u16, elapsed: Duration) {
    REQUEST_DURATION_SECONDS
        .with_label_values(&[&status.to_string()])
        .observe(elapsed.as_secs_f64());
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
