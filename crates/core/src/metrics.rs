//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Manifest fetches against the hosting platform
//! - Submissions by outcome
//! - Catalog sweeps (runs, duration, per-entry results, catalog health)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Hosting
// =============================================================================

/// File fetches by result.
pub static FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("sopreg_fetches_total", "Total file fetches from hosting platform"),
        &["result"], // "ok", "not_found", "unreachable"
    )
    .unwrap()
});

// =============================================================================
// Submissions
// =============================================================================

/// Submissions by outcome.
pub static SUBMISSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("sopreg_submissions_total", "Total submissions processed"),
        &["outcome"], // "accepted", "rejected_scope", "rejected_manifest", ...
    )
    .unwrap()
});

// =============================================================================
// Sweeps
// =============================================================================

/// Sweeps completed.
pub static SWEEPS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("sopreg_sweeps_total", "Total catalog sweeps completed").unwrap()
});

/// Sweep duration in seconds.
pub static SWEEP_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("sopreg_sweep_duration_seconds", "Duration of catalog sweeps")
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0]),
    )
    .unwrap()
});

/// Entries reconciled by result.
pub static ENTRIES_RECONCILED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("sopreg_entries_reconciled_total", "Total catalog entries reconciled"),
        &["result"], // "valid", "invalid"
    )
    .unwrap()
});

/// Packages in the catalog after the last sweep or submission.
pub static CATALOG_PACKAGES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("sopreg_catalog_packages", "Number of packages in the catalog").unwrap()
});

/// Packages currently marked valid.
pub static CATALOG_VALID: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("sopreg_catalog_valid_packages", "Number of valid packages").unwrap()
});

/// Packages currently marked invalid.
pub static CATALOG_INVALID: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("sopreg_catalog_invalid_packages", "Number of invalid packages").unwrap()
});

/// Update the catalog gauges from a package count and valid count.
pub fn set_catalog_health(packages: usize, valid: usize) {
    CATALOG_PACKAGES.set(packages as i64);
    CATALOG_VALID.set(valid as i64);
    CATALOG_INVALID.set(packages.saturating_sub(valid) as i64);
}

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(FETCHES.clone()),
        Box::new(SUBMISSIONS.clone()),
        Box::new(SWEEPS_TOTAL.clone()),
        Box::new(SWEEP_DURATION.clone()),
        Box::new(ENTRIES_RECONCILED.clone()),
        Box::new(CATALOG_PACKAGES.clone()),
        Box::new(CATALOG_VALID.clone()),
        Box::new(CATALOG_INVALID.clone()),
    ]
}
