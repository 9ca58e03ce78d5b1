//! Per-resource lifecycle decisions and the side effects they trigger.

use super::duration::{parse_duration, ParseError};
use super::schedule::Schedule;
use super::timestamp::Clock;
use crate::actions::{Decommissioner, Destroyer, Notifier, Tagger};
use crate::config::AppConfig;
use crate::email::OwnerMailer;
use crate::hooks::WebhookDispatcher;
use crate::reporting::ReporterSet;
use crate::search::{
    DateRangeQuery, QueryError, ResourceFinder, ResourceStatus, TermFilter, DATE_FORMAT,
    RENEWED_AT_TAG,
};
use crate::server::metrics;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Everything the evaluator talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub finder: Arc<dyn ResourceFinder>,
    pub tagger: Arc<dyn Tagger>,
    pub notifier: Arc<dyn Notifier>,
    pub decommissioner: Arc<dyn Decommissioner>,
    pub destroyer: Arc<dyn Destroyer>,
    pub owner_mail: Arc<OwnerMailer>,
    pub webhooks: Arc<WebhookDispatcher>,
    pub reporters: ReporterSet,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhaseKind {
    Notify,
    Decommission,
    Destroy,
}

impl PhaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKind::Notify => "notify",
            PhaseKind::Decommission => "decommission",
            PhaseKind::Destroy => "destroy",
        }
    }
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to a single resource during a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceOutcome {
    Notified,
    /// Every crossed threshold was already notified.
    NotDue,
    /// Unprocessable this tick, e.g. no org or an unreadable timestamp.
    Skipped,
    /// A tag or action call failed; nothing was changed.
    Failed,
    /// The notification wasn't delivered and the tag was rolled back.
    DeliveryFailed,
    Decommissioned,
    Destroyed,
}

impl ResourceOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceOutcome::Notified => "notified",
            ResourceOutcome::NotDue => "not_due",
            ResourceOutcome::Skipped => "skipped",
            ResourceOutcome::Failed => "failed",
            ResourceOutcome::DeliveryFailed => "delivery_failed",
            ResourceOutcome::Decommissioned => "decommissioned",
            ResourceOutcome::Destroyed => "destroyed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: PhaseKind,
    pub outcomes: Vec<(String, ResourceOutcome)>,
    /// Set when cancellation stopped the phase before the last resource.
    pub cancelled: bool,
}

impl PhaseReport {
    pub fn new(phase: PhaseKind) -> Self {
        Self {
            phase,
            outcomes: Vec::new(),
            cancelled: false,
        }
    }

    pub(crate) fn record(&mut self, id: &str, outcome: ResourceOutcome) {
        metrics::record_resource_outcome(self.phase.as_str(), outcome.as_str());
        self.outcomes.push((id.to_string(), outcome));
    }

    pub fn count(&self, outcome: ResourceOutcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }

    pub fn outcome_of(&self, id: &str) -> Option<ResourceOutcome> {
        self.outcomes
            .iter()
            .find(|(resource_id, _)| resource_id == id)
            .map(|(_, outcome)| *outcome)
    }
}

impl std::fmt::Display for PhaseReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: BTreeMap<ResourceOutcome, usize> = BTreeMap::new();
        for (_, outcome) in &self.outcomes {
            *counts.entry(*outcome).or_default() += 1;
        }
        write!(f, "{}: {} resources", self.phase, self.outcomes.len())?;
        for (outcome, count) in counts {
            write!(f, ", {} {}", count, outcome.as_str())?;
        }
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

/// Failures that abort a whole phase for the current tick.
#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("{0}")]
    Query(#[from] QueryError),

    #[error("Bad schedule: {0}")]
    Schedule(#[from] ParseError),
}

pub struct LifecycleEvaluator {
    pub(crate) collaborators: Collaborators,
    pub(crate) schedule: Schedule,
    pub(crate) filter: BTreeMap<String, String>,
    pub(crate) base_url: String,
    pub(crate) secret: String,
}

impl LifecycleEvaluator {
    pub fn new(config: &AppConfig, collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            schedule: Schedule::new(
                config.notify.ages.clone(),
                config.decommission.age.clone(),
                config.destroy.age.clone(),
            ),
            filter: config.filter.clone(),
            base_url: config.base_url.clone(),
            secret: config.encryption_secret.clone(),
        }
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// `renewed_at` older than `age`, with the configured filters plus
    /// `status`.
    ///
    /// The age is handed to the backend in seconds since its date math has
    /// no month unit.
    pub(crate) fn phase_query(
        &self,
        age: &str,
        status: ResourceStatus,
    ) -> Result<DateRangeQuery, ParseError> {
        let age = parse_duration(age)?;
        Ok(DateRangeQuery::new(RENEWED_AT_TAG)
            .format(DATE_FORMAT)
            .lte(format!("now-{}s", age.as_secs()))
            .filters(TermFilter::from_map(&self.filter))
            .filter(TermFilter::new("status", status.as_str())))
    }
}
