//! Configuration and collaborator wiring for end-to-end tests

use super::constants::*;
use super::fakes::Fleet;
use reaper::config::AppConfig;
use reaper::email::{MailTemplates, OwnerMailer};
use reaper::hooks::WebhookDispatcher;
use reaper::lifecycle::{Collaborators, FixedClock};
use reaper::reporting::{EventReporter, ReporterSet};
use reaper::server::RequestsLoggingLevel;
use std::sync::Arc;

/// Configuration for a reaper whose renewal links point at `base_url`.
pub fn test_config(base_url: &str) -> AppConfig {
    let mut config = AppConfig {
        base_url: base_url.to_string(),
        redirect_url: "https://spinup.example.edu".to_string(),
        spinup_url: "https://spinup.example.edu".to_string(),
        encryption_secret: SECRET.to_string(),
        requests_logging_level: RequestsLoggingLevel::None,
        ..Default::default()
    };
    config.notify.ages = vec!["25d".to_string(), "5d".to_string(), "20d".to_string()];
    config.decommission.age = "30d".to_string();
    config.destroy.age = "44d".to_string();
    config
        .filter
        .insert("yale:subsidized".to_string(), "true".to_string());
    config
}

/// Every collaborator backed by `fleet`, on a clock frozen at `NOW`.
pub fn fleet_collaborators(fleet: &Arc<Fleet>) -> Collaborators {
    Collaborators {
        finder: fleet.clone(),
        tagger: fleet.clone(),
        notifier: fleet.clone(),
        decommissioner: fleet.clone(),
        destroyer: fleet.clone(),
        owner_mail: Arc::new(OwnerMailer::new(
            fleet.clone(),
            fleet.clone(),
            MailTemplates::new().expect("Failed to load mail templates"),
            "https://spinup.example.edu",
            "https://spinup.example.edu/site",
        )),
        webhooks: Arc::new(WebhookDispatcher::default()),
        reporters: ReporterSet::new(vec![fleet.clone() as Arc<dyn EventReporter>]),
        clock: Arc::new(FixedClock::at(NOW).expect("NOW is a valid timestamp")),
    }
}
