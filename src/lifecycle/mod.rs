//! Resource lifecycle: age thresholds, timestamps and the three phases run
//! on every tick.

mod decommission;
mod destroy;
mod duration;
mod evaluator;
mod notify;
mod schedule;
mod timestamp;

#[cfg(test)]
pub(crate) use evaluator::tests as test_support;

pub use duration::{parse_duration, sort_thresholds, ParseError};
pub use evaluator::{
    Collaborators, LifecycleEvaluator, PhaseError, PhaseKind, PhaseReport, ResourceOutcome,
};
pub use notify::{next_notification, NotifyDecision};
pub use schedule::Schedule;
pub use timestamp::{
    format_timestamp, parse_timestamp, shift_forward, Clock, FixedClock, SystemClock,
    TIMESTAMP_FORMAT,
};
