use super::evaluator::{LifecycleEvaluator, PhaseError, PhaseKind, PhaseReport, ResourceOutcome};
use super::timestamp::{format_timestamp, parse_timestamp};
use crate::hooks::{Event, EventAction};
use crate::search::{Resource, ResourceStatus};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

impl LifecycleEvaluator {
    /// Decommission every created resource past the decommission age.
    ///
    /// A failed call changes nothing locally; the resource is picked up
    /// again by the next tick's query.
    pub async fn run_decommission(
        &self,
        cancel: &CancellationToken,
    ) -> Result<PhaseReport, PhaseError> {
        let mut report = PhaseReport::new(PhaseKind::Decommission);
        let query = self.phase_query(self.schedule.decommission_age(), ResourceStatus::Created)?;
        let resources = self.collaborators.finder.find(&[query]).await?;
        info!("Decommission phase found {} resources", resources.len());

        for resource in &resources {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let outcome = self.decommission_resource(resource).await;
            report.record(&resource.id, outcome);
        }
        Ok(report)
    }

    async fn decommission_resource(&self, resource: &Resource) -> ResourceOutcome {
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
        let (expire_on, destroy_at) = match (
            self.schedule.decommission_at(renewed_at),
            self.schedule.destroy_at(renewed_at),
        ) {
            (Ok(expire_on), Ok(destroy_at)) => (expire_on, destroy_at),
            (Err(err), _) | (_, Err(err)) => {
                error!("Can't schedule {}: {}", resource.id, err);
                return ResourceOutcome::Skipped;
            }
        };
        if destroy_at < self.collaborators.clock.now() {
            warn!(
                "{} has crossed the destroy threshold but hasn't been decommissioned (destruction scheduled: {})",
                resource.id, destroy_at
            );
        }
        info!(
            "{} has crossed the decommission threshold (destruction scheduled: {})",
            resource.id, destroy_at
        );

        let reporters = &self.collaborators.reporters;
        reporters
            .info(&format!(
                "Decommissioning {} ({}), renewed at {}",
                resource.fqdn, resource.id, resource.renewed_at
            ))
            .await;

        if let Err(err) = self
            .collaborators
            .decommissioner
            .decommission(resource)
            .await
        {
            error!("{}", err);
            reporters
                .error(&format!(
                    "FAILED to decommission {} ({})",
                    resource.fqdn, resource.id
                ))
                .await;
            return ResourceOutcome::Failed;
        }

        self.collaborators
            .webhooks
            .dispatch(&Event::new(EventAction::Decommission, resource.id.clone()))
            .await;

        // Decommission has already happened, the mail is best effort.
        if let Err(err) = self
            .collaborators
            .owner_mail
            .send_decommissioned(resource, &format_timestamp(expire_on))
            .await
        {
            warn!(
                "Decommissioned {} but failed to email its owner: {}",
                resource.id, err
            );
        }

        ResourceOutcome::Decommissioned
    }
}
