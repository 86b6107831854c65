//! Recommendation Metrics
//!
//! Generation volume plus the retention cleaner and batch generator jobs

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};
use std::time::Duration;

static RECOMMENDATIONS_GENERATED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "bridge_recommendations_generated_total",
        "Recommendations emitted by the generator, by type",
        &["type"]
    )
    .expect("Failed to register recommendations generated metric")
});

static JOB_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "bridge_recommendation_job_runs_total",
        "Background job cycles by job and status (success/error)",
        &["job", "status"]
    )
    .expect("Failed to register recommendation job runs metric")
});

static JOB_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "bridge_recommendation_job_duration_seconds",
        "Duration of background recommendation jobs",
        &["job"],
        vec![0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0]
    )
    .expect("Failed to register recommendation job duration metric")
});

static RECOMMENDATIONS_DELETED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "bridge_recommendations_deleted_total",
        "Terminal recommendations removed by retention cleanup"
    )
    .expect("Failed to register recommendations deleted metric")
});

pub fn record_generated(rec_type: &str) {
    RECOMMENDATIONS_GENERATED_TOTAL
        .with_label_values(&[rec_type])
        .inc();
}

/// Record job result (success/error)
pub fn record_job_run(job: &str, status: &str) {
    JOB_RUNS_TOTAL.with_label_values(&[job, status]).inc();
}

pub fn record_job_duration(job: &str, duration: Duration) {
    JOB_DURATION_SECONDS
        .with_label_values(&[job])
        .observe(duration.as_secs_f64());
}

pub fn record_deleted(count: u64) {
    RECOMMENDATIONS_DELETED_TOTAL.inc_by(count);
}
