use super::context::PhaseContext;
use crate::lifecycle::{PhaseError, PhaseKind, PhaseReport};
use async_trait::async_trait;
use std::sync::Arc;

/// One pass over the resources, run once per tick.
#[async_trait]
pub trait LifecyclePhase: Send + Sync {
    fn kind(&self) -> PhaseKind;

    fn description(&self) -> &'static str;

    async fn run(&self, ctx: &PhaseContext) -> Result<PhaseReport, PhaseError>;
}

pub struct NotifyPhase;

#[async_trait]
impl LifecyclePhase for NotifyPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Notify
    }

    fn description(&self) -> &'static str {
        "Remind owners of resources crossing a notify age"
    }

    async fn run(&self, ctx: &PhaseContext) -> Result<PhaseReport, PhaseError> {
        ctx.evaluator.run_notify(&ctx.cancellation_token).await
    }
}

pub struct DecommissionPhase;

#[async_trait]
impl LifecyclePhase for DecommissionPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Decommission
    }

    fn description(&self) -> &'static str {
        "Decommission created resources past the decommission age"
    }

    async fn run(&self, ctx: &PhaseContext) -> Result<PhaseReport, PhaseError> {
        ctx.evaluator.run_decommission(&ctx.cancellation_token).await
    }
}

pub struct DestroyPhase;

#[async_trait]
impl LifecyclePhase for DestroyPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Destroy
    }

    fn description(&self) -> &'static str {
        "Destroy decommissioned resources past the destroy age"
    }

    async fn run(&self, ctx: &PhaseContext) -> Result<PhaseReport, PhaseError> {
        ctx.evaluator.run_destroy(&ctx.cancellation_token).await
    }
}

/// The three lifecycle phases, in the order they are registered.
pub fn default_phases() -> Vec<Arc<dyn LifecyclePhase>> {
    vec![
        Arc::new(DestroyPhase),
        Arc::new(DecommissionPhase),
        Arc::new(NotifyPhase),
    ]
}
