//! Controller module
//!
//! Drives the periodic fetch-decide-act cycle against the configured metric
//! source and scaling backend.

mod autoscaler;

pub use autoscaler::{ControlLoop, TickOutcome};
