//! Scaling Policy - "The Brain"
//!
//! Pure decision function: given the current load sample, the current fleet
//! size, and the configured thresholds and bounds, return a scaling decision.
//! No I/O, no mutation, so every branch is unit-testable.
//!
//! Two thresholds give hysteresis: load must cross `scale_up_threshold` to
//! grow the fleet and fall to `scale_down_threshold` to shrink it, so values
//! oscillating between the two never flap the fleet size.

use crate::config::Config;
use crate::domain::{Decision, LoadSample};

/// Thresholds and bounds the policy evaluates against.
///
/// Extracted from [`Config`] so the policy does not see endpoint or probe
/// settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLimits {
    /// Scale up at or above this load.
    pub scale_up_threshold: f64,
    /// Scale down at or below this load.
    pub scale_down_threshold: f64,
    /// Hard floor for the fleet size.
    pub min_instances: u32,
    /// Hard ceiling for the fleet size.
    pub max_instances: u32,
}

impl From<&Config> for ScaleLimits {
    fn from(cfg: &Config) -> Self {
        Self {
            scale_up_threshold: cfg.scale_up_threshold,
            scale_down_threshold: cfg.scale_down_threshold,
            min_instances: cfg.min_instances,
            max_instances: cfg.max_instances,
        }
    }
}

/// Decide the scaling action for one tick.
///
/// Threshold comparisons are inclusive: a sample exactly at a threshold
/// triggers the action. Bounds are hard: a decision that would push the count
/// outside `[min_instances, max_instances]` is clamped to `Hold` here, never
/// attempted and rejected later.
///
/// Failed fetches never reach this function; the control loop holds on fetch
/// errors before a sample exists.
pub fn decide(sample: &LoadSample, current: u32, limits: &ScaleLimits) -> Decision {
    if sample.value >= limits.scale_up_threshold && current < limits.max_instances {
        Decision::ScaleUp
    } else if sample.value <= limits.scale_down_threshold && current > limits.min_instances {
        Decision::ScaleDown
    } else {
        Decision::Hold
    }
}
