//! Fleetscaler - Threshold-Driven Fleet Autoscaler
//!
//! A control-loop autoscaler that periodically samples a load signal from a
//! monitored service, evaluates it against configured thresholds with
//! hysteresis, and issues single-step scale actions to keep the fleet size
//! within a bounded range.
//!
//! # Architecture
//!
//! The autoscaler follows a three-component "Eyes, Brain, Hands" pattern:
//!
//! ```text
//! Metric Source (Eyes) → Scaling Policy (Brain) → Scaling Backend (Hands)
//! ```
//!
//! The control loop drives one fetch-decide-act cycle per tick and publishes
//! its state to a shared status read by the health probe. Transient fetch and
//! scale failures are recovered per tick; the loop runs indefinitely and
//! self-heals on the next successful tick.
//!
//! # Modules
//!
//! - [`adapters`] - HTTP adapters implementing the domain ports
//! - [`config`] - Validated YAML configuration
//! - [`controller`] - The periodic control loop
//! - [`domain`] - Domain layer with ports and value objects
//! - [`error`] - Error types
//! - [`policy`] - Pure scaling decision function
//! - [`probe`] - Health/readiness/status/metrics HTTP server
//! - [`telemetry`] - Prometheus instrumentation

pub mod adapters;
pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod policy;
pub mod probe;
pub mod telemetry;

// Re-export commonly used types
pub use adapters::{HttpMetricSource, HttpScalingBackend};
pub use config::Config;
pub use controller::{ControlLoop, TickOutcome};
pub use domain::ports::{MetricSource, ScalingBackend};
pub use domain::{Decision, LoadSample, LoopState, LoopStatus, SharedStatus};
pub use error::{Error, Result};
pub use policy::{decide, ScaleLimits};
