//! Control Loop
//!
//! Orchestrates periodic ticks: sample the load signal, run the scaling
//! policy, dispatch scale actions, and publish the outcome to the shared
//! loop status. Transient failures are recovered locally; the loop is
//! designed to run indefinitely and self-heal on the next successful tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::domain::ports::{MetricSource, ScalingBackend};
use crate::domain::{Decision, LoopState, LoopStatus, SharedStatus};
use crate::error::Result;
use crate::policy::{decide, ScaleLimits};
use crate::telemetry;

/// Result of one fetch-decide-act cycle.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    /// Decision the policy took, `Hold` when the fetch failed.
    pub decision: Decision,
    /// Fleet size after the tick; unchanged on any failure.
    pub instance_count: u32,
    /// Load value the decision was based on, `None` when the fetch failed.
    pub sample: Option<f64>,
    /// Transient error recorded for this tick, if any.
    pub error: Option<String>,
}

/// Timer-driven autoscaling loop.
///
/// Ticks are strictly serialized: one task drives the interval, and a tick
/// that overruns causes the next to be skipped, never run concurrently.
/// Shutdown is observed between ticks, so an in-flight scale action is never
/// aborted mid-flight.
pub struct ControlLoop {
    source: Arc<dyn MetricSource>,
    backend: Arc<dyn ScalingBackend>,
    limits: ScaleLimits,
    poll_interval: Duration,
    max_runtime: Option<Duration>,
    status: SharedStatus,
    shutdown: CancellationToken,
}

impl ControlLoop {
    /// Create a new control loop over the given capabilities.
    pub fn new(
        source: Arc<dyn MetricSource>,
        backend: Arc<dyn ScalingBackend>,
        limits: ScaleLimits,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            source,
            backend,
            limits,
            poll_interval,
            max_runtime: None,
            status: Arc::new(RwLock::new(LoopStatus::new(limits.min_instances))),
            shutdown,
        }
    }

    /// Bound the whole loop's lifetime. Used by tests.
    pub fn with_max_runtime(mut self, max_runtime: Duration) -> Self {
        self.max_runtime = Some(max_runtime);
        self
    }

    /// Shared status handle for the health probe.
    pub fn status_handle(&self) -> SharedStatus {
        Arc::clone(&self.status)
    }

    /// Run until shutdown is requested or the max runtime elapses.
    pub async fn run(self) -> Result<()> {
        self.seed_instance_count().await;

        info!(
            "Starting control loop (scale up >= {}, scale down <= {}, fleet {}..={}, every {:?})",
            self.limits.scale_up_threshold,
            self.limits.scale_down_threshold,
            self.limits.min_instances,
            self.limits.max_instances,
            self.poll_interval,
        );

        let deadline = self.max_runtime.map(|d| time::Instant::now() + d);
        let mut interval = time::interval(self.poll_interval);
        // A slow tick skips the next schedule instead of bursting to catch
        // up; ticks never overlap.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                // Shutdown prevents new ticks from starting, so check it
                // before an already-elapsed interval.
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested, stopping control loop");
                    break;
                }
                _ = interval.tick() => {
                    if let Some(deadline) = deadline {
                        if time::Instant::now() >= deadline {
                            info!("Max runtime reached, stopping control loop");
                            break;
                        }
                    }
                    self.tick().await;
                }
            }
        }

        info!(
            "Control loop stopped after {} ticks",
            self.status.read().ticks_completed
        );
        Ok(())
    }

    /// Seed the instance count from the backend, falling back to the
    /// configured floor when the backend cannot answer at startup.
    async fn seed_instance_count(&self) {
        let count = match self.backend.current_instances().await {
            Ok(count) => {
                if count < self.limits.min_instances || count > self.limits.max_instances {
                    warn!(
                        "Backend reports {} instances, outside the configured {}..={} range",
                        count, self.limits.min_instances, self.limits.max_instances
                    );
                }
                info!("Seeded instance count from backend: {}", count);
                count
            }
            Err(e) => {
                warn!(
                    "Backend cannot report the fleet size at startup ({}); assuming min_instances = {}",
                    e, self.limits.min_instances
                );
                self.limits.min_instances
            }
        };
        self.status.write().instance_count = count;
        telemetry::INSTANCE_COUNT.set(i64::from(count));
    }

    /// Run one fetch-decide-act cycle and publish the outcome.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> TickOutcome {
        telemetry::TICKS_TOTAL.inc();

        let current = {
            let mut status = self.status.write();
            status.state = LoopState::Ticking;
            status.instance_count
        };

        let outcome = self.evaluate(current).await;

        telemetry::DECISIONS_TOTAL
            .with_label_values(&[outcome.decision.as_str()])
            .inc();
        telemetry::INSTANCE_COUNT.set(i64::from(outcome.instance_count));

        let mut status = self.status.write();
        status.state = if outcome.error.is_some() {
            LoopState::Error
        } else {
            LoopState::Idle
        };
        status.instance_count = outcome.instance_count;
        status.last_decision = Some(outcome.decision);
        status.last_sample = outcome.sample;
        status.last_error = outcome.error.clone();
        status.last_tick_at = Some(Utc::now());
        status.ticks_completed += 1;
        drop(status);

        outcome
    }

    async fn evaluate(&self, current: u32) -> TickOutcome {
        // Never scale on missing data: a failed fetch is a policy-level Hold.
        let sample = match self.source.fetch().await {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Load fetch failed, holding: {}", e);
                telemetry::TICK_ERRORS_TOTAL
                    .with_label_values(&[e.stage()])
                    .inc();
                return TickOutcome {
                    decision: Decision::Hold,
                    instance_count: current,
                    sample: None,
                    error: Some(e.to_string()),
                };
            }
        };

        let decision = decide(&sample, current, &self.limits);
        debug!(
            "Tick: load={:.2} instances={} decision={}",
            sample.value, current, decision
        );

        let applied = match decision {
            Decision::Hold => Ok(current),
            Decision::ScaleUp => self.backend.scale_up(current).await,
            Decision::ScaleDown => self.backend.scale_down(current).await,
        };

        match applied {
            Ok(count) => {
                if decision != Decision::Hold {
                    info!(
                        "{}: load {:.2}, instances {} -> {}",
                        decision, sample.value, current, count
                    );
                }
                TickOutcome {
                    decision,
                    instance_count: count,
                    sample: Some(sample.value),
                    error: None,
                }
            }
            Err(e) => {
                // Keep the last known-good count; the next tick re-evaluates
                // from fresh data.
                warn!("Scale action failed, keeping {} instances: {}", current, e);
                telemetry::TICK_ERRORS_TOTAL
                    .with_label_values(&[e.stage()])
                    .inc();
                TickOutcome {
                    decision,
                    instance_count: current,
                    sample: Some(sample.value),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LoadSample;
    use crate::error::Error;
    use async_trait::async_trait;

    struct FixedSource(f64);

    #[async_trait]
    impl MetricSource for FixedSource {
        async fn fetch(&self) -> Result<LoadSample> {
            Ok(LoadSample::new(self.0))
        }
    }

    struct UnreachableBackend;

    #[async_trait]
    impl ScalingBackend for UnreachableBackend {
        async fn current_instances(&self) -> Result<u32> {
            Err(Error::ScaleStatus { status: 503 })
        }
        async fn scale_up(&self, _current: u32) -> Result<u32> {
            Err(Error::ScaleStatus { status: 503 })
        }
        async fn scale_down(&self, _current: u32) -> Result<u32> {
            Err(Error::ScaleStatus { status: 503 })
        }
    }

    fn limits() -> ScaleLimits {
        ScaleLimits {
            scale_up_threshold: 80.0,
            scale_down_threshold: 20.0,
            min_instances: 1,
            max_instances: 10,
        }
    }

    fn control_loop(source: Arc<dyn MetricSource>, backend: Arc<dyn ScalingBackend>) -> ControlLoop {
        ControlLoop::new(
            source,
            backend,
            limits(),
            Duration::from_secs(1),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_seed_falls_back_to_min_instances() {
        let loop_ = control_loop(Arc::new(FixedSource(50.0)), Arc::new(UnreachableBackend));
        loop_.seed_instance_count().await;
        assert_eq!(loop_.status_handle().read().instance_count, 1);
    }

    #[tokio::test]
    async fn test_failed_scale_keeps_count_and_records_error() {
        let loop_ = control_loop(Arc::new(FixedSource(95.0)), Arc::new(UnreachableBackend));
        loop_.status_handle().write().instance_count = 4;

        let outcome = loop_.tick().await;
        assert_eq!(outcome.decision, Decision::ScaleUp);
        assert_eq!(outcome.instance_count, 4);
        assert!(outcome.error.is_some());

        let status = loop_.status_handle().read().clone();
        assert_eq!(status.state, LoopState::Error);
        assert_eq!(status.instance_count, 4);
        assert_eq!(status.ticks_completed, 1);
    }

    #[tokio::test]
    async fn test_hold_tick_never_touches_backend() {
        // UnreachableBackend would error if called; a mid-band sample must not
        // reach it.
        let loop_ = control_loop(Arc::new(FixedSource(50.0)), Arc::new(UnreachableBackend));
        loop_.status_handle().write().instance_count = 3;

        let outcome = loop_.tick().await;
        assert_eq!(outcome.decision, Decision::Hold);
        assert_eq!(outcome.instance_count, 3);
        assert!(outcome.error.is_none());
        assert_eq!(loop_.status_handle().read().state, LoopState::Idle);
    }
}
