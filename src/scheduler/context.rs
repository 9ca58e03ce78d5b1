use crate::lifecycle::LifecycleEvaluator;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Context handed to a phase for one tick.
#[derive(Clone)]
pub struct PhaseContext {
    pub evaluator: Arc<LifecycleEvaluator>,

    /// Child of the scheduler's shutdown token. Phases check it between
    /// resources.
    pub cancellation_token: CancellationToken,
}

impl PhaseContext {
    pub fn new(evaluator: Arc<LifecycleEvaluator>, cancellation_token: CancellationToken) -> Self {
        Self {
            evaluator,
            cancellation_token,
        }
    }
}
