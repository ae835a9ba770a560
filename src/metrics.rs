//! Lightweight in-memory run metrics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use serde::Serialize;

#[derive(Default)]
struct RunMetrics {
    runs: AtomicU64,
    runs_failed: AtomicU64,
    run_duration_total_ms: AtomicU64,
    run_duration_max_ms: AtomicU64,
    fetches: AtomicU64,
    fetches_failed: AtomicU64,
    fetches_skipped: AtomicU64,
    fetch_duration_total_ms: AtomicU64,
}

static RUN_METRICS: OnceLock<RunMetrics> = OnceLock::new();

fn metrics() -> &'static RunMetrics {
    RUN_METRICS.get_or_init(RunMetrics::default)
}

pub fn record_run(duration_ms: f64, success: bool) {
    let duration_ms = duration_ms.max(0.0) as u64;
    let metrics = metrics();
    metrics.runs.fetch_add(1, Ordering::Relaxed);
    if !success {
        metrics.runs_failed.fetch_add(1, Ordering::Relaxed);
    }
    metrics
        .run_duration_total_ms
        .fetch_add(duration_ms, Ordering::Relaxed);
    metrics
        .run_duration_max_ms
        .fetch_max(duration_ms, Ordering::Relaxed);
}

pub fn record_fetch(duration_ms: f64) {
    let metrics = metrics();
    metrics.fetches.fetch_add(1, Ordering::Relaxed);
    metrics
        .fetch_duration_total_ms
        .fetch_add(duration_ms.max(0.0) as u64, Ordering::Relaxed);
}

pub fn record_fetch_failure() {
    metrics().fetches_failed.fetch_add(1, Ordering::Relaxed);
}

pub fn record_fetch_skipped() {
    metrics().fetches_skipped.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMetricsSnapshot {
    pub runs: u64,
    pub runs_failed: u64,
    pub avg_run_ms: Option<f64>,
    pub max_run_ms: Option<u64>,
    pub fetches: u64,
    pub fetches_failed: u64,
    pub fetches_skipped: u64,
    pub avg_fetch_ms: Option<f64>,
}

pub fn snapshot() -> RunMetricsSnapshot {
    let metrics = metrics();
    let runs = metrics.runs.load(Ordering::Relaxed);
    let fetches = metrics.fetches.load(Ordering::Relaxed);
    let run_total = metrics.run_duration_total_ms.load(Ordering::Relaxed);
    let fetch_total = metrics.fetch_duration_total_ms.load(Ordering::Relaxed);
    let max_ms = metrics.run_duration_max_ms.load(Ordering::Relaxed);

    RunMetricsSnapshot {
        runs,
        runs_failed: metrics.runs_failed.load(Ordering::Relaxed),
        avg_run_ms: (runs > 0).then(|| run_total as f64 / runs as f64),
        max_run_ms: (max_ms > 0).then_some(max_ms),
        fetches,
        fetches_failed: metrics.fetches_failed.load(Ordering::Relaxed),
        fetches_skipped: metrics.fetches_skipped.load(Ordering::Relaxed),
        avg_fetch_ms: (fetches > 0).then(|| fetch_total as f64 / fetches as f64),
    }
}
