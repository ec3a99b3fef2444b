//! Prometheus metrics for resolutions and the instance directory
//!
//! All collectors register into the default registry on first use and are
//! exposed by the web server at `GET /metrics`.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram, IntCounter,
    IntCounterVec, TextEncoder,
};

/// Resolutions by final result
/// Labels: result (success/failure/no_url)
pub static RESOLVE_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "vidrelay_resolve_requests_total",
        "Total number of user resolve requests by result",
        &["result"]
    )
    .unwrap_or_else(|e| panic_registration("vidrelay_resolve_requests_total", e))
});

/// Single instance attempts by outcome
/// Labels: outcome (success/unreachable/timeout/rejected/malformed/no_link/deadline)
pub static INSTANCE_ATTEMPTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "vidrelay_instance_attempts_total",
        "Total number of resolver instance attempts by outcome",
        &["outcome"]
    )
    .unwrap_or_else(|e| panic_registration("vidrelay_instance_attempts_total", e))
});

/// Times the directory had to hand out the hardcoded fallback instance
pub static DIRECTORY_FALLBACKS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "vidrelay_directory_fallbacks_total",
        "Total number of times the instance directory fell back to the hardcoded instance"
    )
    .unwrap_or_else(|e| panic_registration("vidrelay_directory_fallbacks_total", e))
});

/// Wall time of a whole resolution
pub static RESOLVE_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "vidrelay_resolve_duration_seconds",
        "Time spent resolving one user link across instances",
        vec![0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 40.0, 60.0]
    )
    .unwrap_or_else(|e| panic_registration("vidrelay_resolve_duration_seconds", e))
});

// Registration only fails on a duplicate name, which is a programming error.
#[allow(clippy::panic)]
fn panic_registration(name: &str, err: prometheus::Error) -> ! {
    panic!("Failed to register metric {}: {}", name, err)
}

/// Touches every collector so they show up in the first scrape.
pub fn init_metrics() {
    Lazy::force(&RESOLVE_REQUESTS_TOTAL);
    Lazy::force(&INSTANCE_ATTEMPTS_TOTAL);
    Lazy::force(&DIRECTORY_FALLBACKS_TOTAL);
    Lazy::force(&RESOLVE_DURATION_SECONDS);
    log::info!("Metrics registry initialized");
}

/// Renders the default registry in the Prometheus text format.
pub fn render() -> Result<(String, String), prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok((
        encoder.format_type().to_string(),
        String::from_utf8_lossy(&buffer).into_owned(),
    ))
}
