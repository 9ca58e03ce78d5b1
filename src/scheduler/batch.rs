use super::context::PhaseContext;
use super::phase::LifecyclePhase;
use crate::lifecycle::{LifecycleEvaluator, PhaseError, PhaseKind, PhaseReport};
use crate::server::metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("{phase} phase panicked: {message}")]
    PhasePanicked { phase: PhaseKind, message: String },
}

type PhaseHandle = (PhaseKind, JoinHandle<Result<PhaseReport, PhaseError>>);

/// Runs every registered phase once per interval.
///
/// Phases of a tick run concurrently and are all joined before the next
/// tick. A phase error only costs that phase its tick; a panic stops the
/// scheduler.
pub struct BatchScheduler {
    phases: Vec<Arc<dyn LifecyclePhase>>,
    evaluator: Arc<LifecycleEvaluator>,
    interval: Duration,
    /// How long shutdown waits for an in-flight tick before warning that it
    /// is slow to finish.
    shutdown_grace: Duration,
    shutdown_token: CancellationToken,
}

impl BatchScheduler {
    pub fn new(
        evaluator: Arc<LifecycleEvaluator>,
        interval: Duration,
        shutdown_grace: Duration,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            phases: Vec::new(),
            evaluator,
            interval,
            shutdown_grace,
            shutdown_token,
        }
    }

    pub fn register_phase(&mut self, phase: Arc<dyn LifecyclePhase>) {
        info!("Registering phase: {} - {}", phase.kind(), phase.description());
        self.phases.push(phase);
    }

    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// Main scheduler loop. The first tick fires one interval after start.
    pub async fn run(&self) -> Result<(), SchedulerError> {
        info!(
            "Starting batch scheduler with {} phases every {:?}",
            self.phases.len(),
            self.interval
        );

        let mut ticker =
            tokio::time::interval_at(tokio::time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_token.cancelled() => {
                    info!("Scheduler received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    if !self.run_tick_until_shutdown().await? {
                        break;
                    }
                }
            }
        }

        info!("Batch scheduler stopped");
        Ok(())
    }

    /// Run one tick. Returns false when shutdown was requested meanwhile.
    ///
    /// Shutdown never interrupts a resource mid-action: phases stop at the
    /// next resource boundary and the tick is always joined.
    async fn run_tick_until_shutdown(&self) -> Result<bool, SchedulerError> {
        let tick = Self::join_tick(self.spawn_tick());
        tokio::pin!(tick);

        tokio::select! {
            result = &mut tick => {
                result?;
                Ok(true)
            }
            _ = self.shutdown_token.cancelled() => {
                info!("Shutdown requested during a tick, waiting for in-flight resources");
                let result = match tokio::time::timeout(self.shutdown_grace, &mut tick).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(
                            "Tick still running {:?} after shutdown, waiting for it to finish",
                            self.shutdown_grace
                        );
                        tick.await
                    }
                };
                result?;
                Ok(false)
            }
        }
    }

    /// Run every phase once and wait for all of them.
    pub async fn run_tick_now(&self) -> Result<Vec<PhaseReport>, SchedulerError> {
        Self::join_tick(self.spawn_tick()).await
    }

    fn spawn_tick(&self) -> Vec<PhaseHandle> {
        metrics::record_batch_tick();
        info!("Batch routine running...");

        self.phases
            .iter()
            .map(|phase| {
                let phase = Arc::clone(phase);
                let kind = phase.kind();
                let ctx = PhaseContext::new(
                    Arc::clone(&self.evaluator),
                    self.shutdown_token.child_token(),
                );

                let handle = tokio::spawn(async move {
                    let start = Instant::now();
                    let result = phase.run(&ctx).await;
                    let elapsed = start.elapsed();

                    match &result {
                        Ok(report) => {
                            info!("{} in {:?}", report, elapsed);
                            metrics::record_phase_run(kind.as_str(), "success", elapsed);
                        }
                        Err(err) => {
                            error!("{} phase failed after {:?}: {}", kind, elapsed, err);
                            let status = match err {
                                PhaseError::Query(_) => "query_error",
                                PhaseError::Schedule(_) => "schedule_error",
                            };
                            metrics::record_phase_run(kind.as_str(), status, elapsed);
                        }
                    }
                    result
                });
                (kind, handle)
            })
            .collect()
    }

    async fn join_tick(handles: Vec<PhaseHandle>) -> Result<Vec<PhaseReport>, SchedulerError> {
        let mut reports = Vec::with_capacity(handles.len());
        let mut fatal = None;

        for (kind, handle) in handles {
            match handle.await {
                Ok(Ok(report)) => reports.push(report),
                // Logged by the phase task, retried next tick.
                Ok(Err(_)) => {}
                Err(err) if err.is_panic() => {
                    error!("{} phase panicked: {}", kind, err);
                    metrics::record_phase_run(kind.as_str(), "panic", Duration::ZERO);
                    if fatal.is_none() {
                        fatal = Some(SchedulerError::PhasePanicked {
                            phase: kind,
                            message: err.to_string(),
                        });
                    }
                }
                Err(err) => {
                    debug!("{} phase task cancelled: {}", kind, err);
                }
            }
        }

        info!("Batch routine sleeping...");
        match fatal {
            Some(err) => Err(err),
            None => Ok(reports),
        }
    }
}
