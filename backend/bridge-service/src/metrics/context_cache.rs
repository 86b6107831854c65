//! Context Cache Metrics

use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, IntCounterVec};

static CONTEXT_CACHE_LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "bridge_context_cache_lookups_total",
        "Context cache lookups by cache and outcome (hit/refreshed/stale/error)",
        &["cache", "outcome"]
    )
    .expect("Failed to register context cache lookups metric")
});

static CONTEXT_CACHE_EVICTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "bridge_context_cache_evictions_total",
        "Context cache evictions by cache and reason (expired/capacity)",
        &["cache", "reason"]
    )
    .expect("Failed to register context cache evictions metric")
});

/// Record a lookup outcome for a named cache
pub fn record_lookup(cache: &str, outcome: &str) {
    CONTEXT_CACHE_LOOKUPS_TOTAL
        .with_label_values(&[cache, outcome])
        .inc();
}

/// Record entries evicted to stay under the size limit
pub fn record_evictions(cache: &str, reason: &str, count: usize) {
    if count > 0 {
        CONTEXT_CACHE_EVICTIONS_TOTAL
            .with_label_values(&[cache, reason])
            .inc_by(count as u64);
    }
}
