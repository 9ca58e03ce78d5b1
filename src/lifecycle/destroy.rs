use super::evaluator::{LifecycleEvaluator, PhaseError, PhaseKind, PhaseReport, ResourceOutcome};
use crate::hooks::{Event, EventAction};
use crate::search::{Resource, ResourceStatus};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

impl LifecycleEvaluator {
    /// Destroy every decommissioned resource past the destroy age.
    pub async fn run_destroy(&self, cancel: &CancellationToken) -> Result<PhaseReport, PhaseError> {
        let mut report = PhaseReport::new(PhaseKind::Destroy);
        let query = self.phase_query(self.schedule.destroy_age(), ResourceStatus::Decom)?;
        let resources = self.collaborators.finder.find(&[query]).await?;
        info!("Destroy phase found {} resources", resources.len());

        for resource in &resources {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let outcome = self.destroy_resource(resource).await;
            report.record(&resource.id, outcome);
        }
        Ok(report)
    }

    async fn destroy_resource(&self, resource: &Resource) -> ResourceOutcome {
        if resource.org.is_empty() {
            error!(
                "Cannot operate on a resource without an org. ID: {}",
                resource.id
            );
            return ResourceOutcome::Skipped;
        }

        let reporters = &self.collaborators.reporters;
        reporters
            .info(&format!(
                "Destroying {} ({}), renewed at {}",
                resource.fqdn, resource.id, resource.renewed_at
            ))
            .await;

        if let Err(err) = self.collaborators.destroyer.destroy(resource).await {
            error!("{}", err);
            reporters
                .error(&format!(
                    "FAILED to destroy {} ({})",
                    resource.fqdn, resource.id
                ))
                .await;
            return ResourceOutcome::Failed;
        }

        self.collaborators
            .webhooks
            .dispatch(&Event::new(EventAction::Destroy, resource.id.clone()))
            .await;
        ResourceOutcome::Destroyed
    }
}

#[cfg(test)]
mod tests {
    use crate::lifecycle::evaluator::tests::{
        evaluator, evaluator_with_hooks, hooks_to, resource, Recorder,
    };
    use crate::lifecycle::ResourceOutcome;
    use crate::testing::RecordingServer;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn destroys_only_decommissioned_resources() {
        let recorder = Arc::new(Recorder::default());
        {
            let mut resources = recorder.resources.lock().unwrap();
            resources.push(resource("i-1", "created", "2024/01/01 12:00:00", ""));
            resources.push(resource("i-2", "decom", "2024/01/01 12:00:00", ""));
        }
        let evaluator = evaluator(&recorder);

        let report = evaluator
            .run_destroy(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.outcome_of("i-2"), Some(ResourceOutcome::Destroyed));
        assert_eq!(report.outcome_of("i-1"), None);
        assert_eq!(*recorder.destroyed.lock().unwrap(), vec!["i-2"]);

        let queries = recorder.queries.lock().unwrap();
        assert_eq!(queries[0][0].lte.as_deref(), Some("now-3801600s"));
        assert_eq!(queries[0][0].filter_value("status"), Some("decom"));
    }

    #[tokio::test]
    async fn failed_destroy_is_reported_and_nothing_is_tagged() {
        let recorder = Arc::new(Recorder::default());
        recorder
            .resources
            .lock()
            .unwrap()
            .push(resource("i-1", "decom", "2024/01/01 12:00:00", ""));
        recorder.fail_action.lock().unwrap().push("i-1".to_string());
        let evaluator = evaluator(&recorder);

        let report = evaluator
            .run_destroy(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.outcome_of("i-1"), Some(ResourceOutcome::Failed));
        assert!(recorder.destroyed.lock().unwrap().is_empty());
        assert!(recorder.tags.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn resource_without_org_is_never_destroyed() {
        let recorder = Arc::new(Recorder::default());
        let mut orphan = resource("i-1", "decom", "2024/01/01 12:00:00", "");
        orphan.org = String::new();
        recorder.resources.lock().unwrap().push(orphan);
        let evaluator = evaluator(&recorder);

        evaluator
            .run_destroy(&CancellationToken::new())
            .await
            .unwrap();
        assert!(recorder.destroyed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn destroy_hook_fires_only_after_success() {
        let hook = RecordingServer::start(StatusCode::OK, "").await;
        let recorder = Arc::new(Recorder::default());
        {
            let mut resources = recorder.resources.lock().unwrap();
            resources.push(resource("i-1", "decom", "2024/01/01 12:00:00", ""));
            resources.push(resource("i-2", "decom", "2024/01/01 12:00:00", ""));
        }
        recorder.fail_action.lock().unwrap().push("i-2".to_string());
        let evaluator = evaluator_with_hooks(&recorder, hooks_to(&hook.url));

        let report = evaluator
            .run_destroy(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.outcome_of("i-2"), Some(ResourceOutcome::Failed));

        let requests = hook.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].json(),
            json!({ "action": "destroy", "server_id": "i-1" })
        );
    }
}
