//! Tick-driven execution of the lifecycle phases.

mod batch;
mod context;
mod phase;

pub use batch::{BatchScheduler, SchedulerError};
pub use context::PhaseContext;
pub use phase::{default_phases, DecommissionPhase, DestroyPhase, LifecyclePhase, NotifyPhase};
