//! Prometheus instrumentation for the control loop.
//!
//! Counters live in the default registry and are served by the probe server's
//! `/metrics` route.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter, IntCounterVec,
    IntGauge,
};

/// Ticks started since process start, including ones that ended in error.
pub static TICKS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("autoscaler_ticks_total", "Total control loop ticks started")
        .expect("ticks counter registration")
});

/// Decisions taken, labeled by kind (scale_up / scale_down / hold).
pub static DECISIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "autoscaler_decisions_total",
        "Scaling decisions taken, by decision kind",
        &["decision"]
    )
    .expect("decisions counter registration")
});

/// Per-tick errors, labeled by pipeline stage (fetch / scale / other).
pub static TICK_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "autoscaler_tick_errors_total",
        "Transient per-tick errors, by pipeline stage",
        &["stage"]
    )
    .expect("errors counter registration")
});

/// Last known-good fleet size.
pub static INSTANCE_COUNT: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "autoscaler_instance_count",
        "Current known fleet size as reported by the scaling backend"
    )
    .expect("instance gauge registration")
});
