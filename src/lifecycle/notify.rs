//! Notify phase.
//!
//! `notified_at` is the only record that a reminder went out, so it is
//! written before delivery and restored to its previous value when delivery
//! fails. The next tick then sees exactly the state it would have seen had
//! nothing been attempted.

use super::duration::{parse_duration, ParseError};
use super::evaluator::{LifecycleEvaluator, PhaseError, PhaseKind, PhaseReport, ResourceOutcome};
use super::schedule::Schedule;
use super::timestamp::{format_timestamp, parse_timestamp, shift_forward};
use crate::actions::NotificationParams;
use crate::hooks::{Event, EventAction};
use crate::renewal::{issue_token, renewal_link};
use crate::search::{Resource, ResourceStatus, NOTIFIED_AT_TAG};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Why a notification is due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyDecision {
    /// Never notified before.
    First,
    /// The given age was crossed after the last notification.
    Threshold(String),
    NotDue,
}

/// Decide whether a resource gets a reminder this tick.
///
/// Ages are walked in ascending order and the first one crossed after
/// `notified_at` wins, so several crossed thresholds still yield a single
/// reminder.
pub fn next_notification(
    schedule: &Schedule,
    renewed_at: NaiveDateTime,
    notified_at: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> Result<NotifyDecision, ParseError> {
    let Some(notified_at) = notified_at else {
        return Ok(NotifyDecision::First);
    };

    for age in schedule.notify_ages() {
        let threshold = shift_forward(renewed_at, parse_duration(age)?)?;
        if threshold < now && notified_at < threshold {
            return Ok(NotifyDecision::Threshold(age.clone()));
        }
        debug!(
            "Already notified ({}) since crossing the {} threshold ({})",
            notified_at, age, threshold
        );
    }
    Ok(NotifyDecision::NotDue)
}

impl LifecycleEvaluator {
    /// Remind owners of every created resource past the smallest notify age.
    pub async fn run_notify(&self, cancel: &CancellationToken) -> Result<PhaseReport, PhaseError> {
        let mut report = PhaseReport::new(PhaseKind::Notify);
        let Some(smallest) = self.schedule.smallest_notify_age() else {
            warn!("No notify ages configured, skipping notify phase");
            return Ok(report);
        };

        let query = self.phase_query(smallest, ResourceStatus::Created)?;
        let resources = self.collaborators.finder.find(&[query]).await?;
        info!("Notify phase found {} resources", resources.len());

        for resource in &resources {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let outcome = self.notify_resource(resource).await;
            report.record(&resource.id, outcome);
        }
        Ok(report)
    }

    async fn notify_resource(&self, resource: &Resource) -> ResourceOutcome {
        if resource.org.is_empty() {
            error!(
                "Cannot operate on a resource without an org. ID: {}",
                resource.id
            );
            return ResourceOutcome::Skipped;
        }

        let renewed_at = match parse_timestamp(&resource.renewed_at) {
            Ok(renewed_at) => renewed_at,
            Err(err) => {
                error!("{} has an unreadable renewed_at: {}", resource.id, err);
                return ResourceOutcome::Skipped;
            }
        };
        let notified_at = if resource.notified_at.is_empty() {
            None
        } else {
            match parse_timestamp(&resource.notified_at) {
                Ok(notified_at) => Some(notified_at),
                Err(err) => {
                    error!("{} has an unreadable notified_at: {}", resource.id, err);
                    return ResourceOutcome::Skipped;
                }
            }
        };

        let now = self.collaborators.clock.now();
        match next_notification(&self.schedule, renewed_at, notified_at, now) {
            Ok(NotifyDecision::NotDue) => return ResourceOutcome::NotDue,
            Ok(NotifyDecision::First) => {
                info!("{} has never been notified, notifying", resource.id);
            }
            Ok(NotifyDecision::Threshold(age)) => {
                info!("{} crossed the {} threshold, notifying", resource.id, age);
            }
            Err(err) => {
                error!("Can't evaluate notify ages for {}: {}", resource.id, err);
                return ResourceOutcome::Skipped;
            }
        }

        let expire_on = match self.schedule.decommission_at(renewed_at) {
            Ok(expire_on) => expire_on,
            Err(err) => {
                error!("Unable to get the decommission date for {}: {}", resource.id, err);
                return ResourceOutcome::Skipped;
            }
        };

        let token = match issue_token(&resource.renewed_at, &self.secret).await {
            Ok(token) => token,
            Err(err) => {
                error!("Failed to generate renewal token for {}: {}", resource.id, err);
                return ResourceOutcome::Failed;
            }
        };
        let link = renewal_link(&self.base_url, &resource.id, &token);

        let reporters = &self.collaborators.reporters;
        let tagger = &self.collaborators.tagger;

        let attempt = BTreeMap::from([(NOTIFIED_AT_TAG.to_string(), format_timestamp(now))]);
        if let Err(err) = tagger.tag(resource, &attempt).await {
            error!("{}", err);
            reporters
                .error(&format!(
                    "FAILED Unable to update tag for {} ({})",
                    resource.fqdn, resource.id
                ))
                .await;
            return ResourceOutcome::Failed;
        }

        reporters
            .info(&format!(
                "Notifying {} for {} ({})",
                resource.owner(),
                resource.fqdn,
                resource.id
            ))
            .await;

        let params = NotificationParams {
            netid: resource.owner().to_string(),
            link,
            expire_on: format_timestamp(expire_on),
            renewed_at: resource.renewed_at.clone(),
            fqdn: resource.fqdn.clone(),
        };
        if let Err(err) = self.collaborators.notifier.notify(&params).await {
            error!("{}. Rolling back notified_at for {}", err, resource.id);
            reporters
                .error(&format!(
                    "FAILED to send notification for {} ({})",
                    resource.fqdn, resource.id
                ))
                .await;

            let previous = BTreeMap::from([(
                NOTIFIED_AT_TAG.to_string(),
                resource.notified_at.clone(),
            )]);
            if let Err(err) = tagger.tag(resource, &previous).await {
                error!("Rollback failed: {}", err);
                reporters
                    .error(&format!(
                        "FAILED Unable to roll back tag for {} ({})",
                        resource.fqdn, resource.id
                    ))
                    .await;
            }
            return ResourceOutcome::DeliveryFailed;
        }

        self.collaborators
            .webhooks
            .dispatch(&Event::new(EventAction::Notify, resource.id.clone()))
            .await;
        ResourceOutcome::Notified
    }
}
