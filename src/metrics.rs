// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for fmcache.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding application is responsible for choosing the exporter.
//!
//! # Metric Naming Convention
//! - `fmcache_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `operation`: write, read, fetch, delete (engine) or set, get, del, hdel (backend)
//! - `status`: success, error
//! - `outcome`: valid, invalid, uncached

use metrics::{counter, histogram};
use std::time::{Duration, Instant};

/// Record a completed operation
pub fn record_operation(operation: &str, status: &str) {
    counter!(
        "fmcache_operations_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record operation latency
pub fn record_latency(operation: &str, duration: Duration) {
    histogram!(
        "fmcache_operation_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a failed backend call
pub fn record_backend_error(operation: &str) {
    counter!(
        "fmcache_backend_errors_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record how the roots of one read were classified
pub fn record_read_outcome(valid: usize, invalid: usize, uncached: usize) {
    counter!("fmcache_read_roots_total", "outcome" => "valid").increment(valid as u64);
    counter!("fmcache_read_roots_total", "outcome" => "invalid").increment(invalid as u64);
    counter!("fmcache_read_roots_total", "outcome" => "uncached").increment(uncached as u64);
}

/// Record a cached field that could not be deserialized
pub fn record_decode_failure() {
    counter!("fmcache_field_decode_failures_total").increment(1);
}

/// Record a loader invocation and how many ids it was asked for
pub fn record_loader_call(ids: usize) {
    counter!("fmcache_loader_calls_total").increment(1);
    histogram!("fmcache_loader_ids").record(ids as f64);
}

/// Record a read-repair partial delete
pub fn record_read_repair(keys: usize, fields: usize) {
    counter!("fmcache_read_repairs_total").increment(1);
    histogram!("fmcache_read_repair_fields").record((keys * fields) as f64);
}

/// Timer guard that records latency on drop
pub struct LatencyTimer {
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.operation, self.start.elapsed());
    }
}
