//! Domain layer: value objects shared by the policy, the control loop, and
//! the health probe.

pub mod ports;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

// =============================================================================
// Value Objects
// =============================================================================

/// A single successful load observation.
///
/// Produced once per tick by a [`ports::MetricSource`] and discarded after the
/// decision; a failed fetch is the `Err` arm of the fetch, never a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadSample {
    /// Observed load value, percent-like (0-100 in steady operation).
    pub value: f64,
    /// When the observation was taken.
    pub observed_at: DateTime<Utc>,
}

impl LoadSample {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            observed_at: Utc::now(),
        }
    }
}

/// Scaling decision for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    ScaleUp,
    ScaleDown,
    Hold,
}

impl Decision {
    /// Stable label used for logging and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::ScaleUp => "scale_up",
            Decision::ScaleDown => "scale_down",
            Decision::Hold => "hold",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Control loop state as seen by the health probe.
///
/// `Error` is transient: the next scheduled tick always runs and overwrites
/// it on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    Idle,
    Ticking,
    Error,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopState::Idle => write!(f, "idle"),
            LoopState::Ticking => write!(f, "ticking"),
            LoopState::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Loop Status
// =============================================================================

/// Snapshot of the control loop, served by the health probe.
///
/// Written only by the control loop; everyone else reads.
#[derive(Debug, Clone, Serialize)]
pub struct LoopStatus {
    /// Current loop state.
    pub state: LoopState,
    /// Last known-good fleet size.
    pub instance_count: u32,
    /// Decision taken by the most recent tick.
    pub last_decision: Option<Decision>,
    /// Load value that produced the last decision.
    pub last_sample: Option<f64>,
    /// Error from the most recent tick, cleared by the next clean tick.
    pub last_error: Option<String>,
    /// Completion time of the most recent tick.
    pub last_tick_at: Option<DateTime<Utc>>,
    /// Total ticks completed since startup.
    pub ticks_completed: u64,
}

impl LoopStatus {
    pub fn new(instance_count: u32) -> Self {
        Self {
            state: LoopState::Idle,
            instance_count,
            last_decision: None,
            last_sample: None,
            last_error: None,
            last_tick_at: None,
            ticks_completed: 0,
        }
    }
}

/// Shared handle to the loop status, single writer (the loop), many readers.
pub type SharedStatus = Arc<RwLock<LoopStatus>>;
