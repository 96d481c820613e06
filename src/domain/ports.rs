//! Domain Ports (Port/Adapter Pattern)
//!
//! Core abstractions the control loop depends on. Infrastructure adapters
//! implement these traits; tests inject scripted fakes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     Control Loop                         │
//! │  ┌─────────────────────────────────────────────────┐    │
//! │  │               Ports (Traits)                     │    │
//! │  │       MetricSource   │   ScalingBackend          │    │
//! │  └─────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Infrastructure Layer                     │
//! │  ┌─────────────────────────────────────────────────┐    │
//! │  │              Adapters (Impls)                    │    │
//! │  │    HttpMetricSource  │  HttpScalingBackend       │    │
//! │  └─────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;

use crate::domain::LoadSample;
use crate::error::Result;

/// Port for sampling the load signal of the monitored service.
///
/// Implementations must bound their work with a timeout: a stalled fetch is
/// an error, not a hang. No side effects beyond the network call.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Fetch the current load value.
    async fn fetch(&self) -> Result<LoadSample>;
}

/// Port for executing scale actions against the fleet.
///
/// Each scale call changes the fleet by exactly one unit and returns the
/// backend's authoritative resulting count; callers trust that value over any
/// locally predicted one. A failed call must leave the fleet size unknown but
/// the caller's last known-good count untouched.
#[async_trait]
pub trait ScalingBackend: Send + Sync {
    /// Query the current fleet size. Used to seed the loop at startup.
    async fn current_instances(&self) -> Result<u32>;

    /// Add one instance to a fleet currently sized `current`.
    async fn scale_up(&self, current: u32) -> Result<u32>;

    /// Remove one instance from a fleet currently sized `current`.
    async fn scale_down(&self, current: u32) -> Result<u32>;
}
