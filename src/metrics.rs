//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Once;

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // API Metrics
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("nomad_api_requests_total", "Total number of backend API requests"),
        &["endpoint", "status"]
    ).expect("metric can be created");

    // Sync Metrics
    pub static ref SYNC_RUNS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("nomad_sync_runs_total", "Total number of outbox sync runs"),
        &["status"]
    ).expect("metric can be created");
    pub static ref OUTBOX_ENTRIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("nomad_outbox_entries_total", "Outbox entries processed during sync"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref OUTBOX_DEPTH: IntGauge = IntGauge::new(
        "nomad_outbox_depth",
        "Current number of pending uploads"
    ).expect("metric can be created");

    // Feed Metrics
    pub static ref FEED_LOADS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("nomad_feed_loads_total", "Total number of feed loads"),
        &["category", "source"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("nomad_errors_total", "Total number of errors"),
        &["error_type", "operation"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Later calls are no-ops.
pub fn init_metrics() {
    INIT.call_once(register_all);
}

fn register_all() {
    REGISTRY
        .register(Box::new(API_REQUESTS_TOTAL.clone()))
        .expect("API_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SYNC_RUNS_TOTAL.clone()))
        .expect("SYNC_RUNS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(OUTBOX_ENTRIES_TOTAL.clone()))
        .expect("OUTBOX_ENTRIES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(OUTBOX_DEPTH.clone()))
        .expect("OUTBOX_DEPTH can be registered");
    REGISTRY
        .register(Box::new(FEED_LOADS_TOTAL.clone()))
        .expect("FEED_LOADS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::debug!("Metrics registry initialized");
}

/// Record an error against the operation that produced it
pub fn record_error(error: &crate::error::AppError, operation: &str) {
    ERRORS_TOTAL
        .with_label_values(&[error.kind(), operation])
        .inc();
}

/// Render all registered metrics in the Prometheus text format
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(error) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!(%error, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
