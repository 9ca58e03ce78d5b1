//! Operator-facing event reports (Slack and friends).

use crate::actions::{http_client, send_checked, RequestFailure, ACTION_TIMEOUT};
use crate::config::{ReporterSettings, SlackSettings};
use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReportLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl ReportLevel {
    fn decorate(&self, message: &str) -> String {
        match self {
            ReportLevel::Debug | ReportLevel::Info => message.to_string(),
            ReportLevel::Warn => format!(":warning: {}", message),
            ReportLevel::Error => format!(":rotating_light: {}", message),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to report event via {reporter}: {failure}")]
    Request {
        reporter: &'static str,
        failure: RequestFailure,
    },
}

#[async_trait]
pub trait EventReporter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn report(&self, message: &str, level: ReportLevel) -> Result<(), ReportError>;
}

#[derive(Serialize)]
struct SlackMessage<'a> {
    text: String,
    link_names: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_emoji: Option<&'a str>,
}

/// Posts to a Slack incoming webhook.
pub struct SlackReporter {
    client: reqwest::Client,
    settings: SlackSettings,
}

impl SlackReporter {
    pub fn new(settings: &SlackSettings) -> Result<Self, RequestFailure> {
        Ok(Self {
            client: http_client(ACTION_TIMEOUT)?,
            settings: settings.clone(),
        })
    }
}

#[async_trait]
impl EventReporter for SlackReporter {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn report(&self, message: &str, level: ReportLevel) -> Result<(), ReportError> {
        debug!("Reporting event via Slack: {}", message);
        let body = SlackMessage {
            text: level.decorate(message),
            link_names: 1,
            channel: self.settings.channel.as_deref(),
            username: self.settings.username.as_deref(),
            icon_emoji: self.settings.icon.as_deref(),
        };

        send_checked(self.client.post(&self.settings.endpoint).json(&body))
            .await
            .map(|_| ())
            .map_err(|failure| ReportError::Request {
                reporter: "slack",
                failure,
            })
    }
}

/// Every configured reporter. Reporting never fails the caller.
#[derive(Default, Clone)]
pub struct ReporterSet {
    reporters: Vec<Arc<dyn EventReporter>>,
}

impl ReporterSet {
    pub fn new(reporters: Vec<Arc<dyn EventReporter>>) -> Self {
        Self { reporters }
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    pub async fn report(&self, message: &str, level: ReportLevel) {
        let results = join_all(
            self.reporters
                .iter()
                .map(|reporter| reporter.report(message, level)),
        )
        .await;
        for result in results {
            if let Err(err) = result {
                error!("Failed to report event ({}): {}", message, err);
            }
        }
    }

    pub async fn info(&self, message: &str) {
        self.report(message, ReportLevel::Info).await
    }

    pub async fn error(&self, message: &str) {
        self.report(message, ReportLevel::Error).await
    }
}

pub fn create_reporters(settings: &[ReporterSettings]) -> Result<ReporterSet, RequestFailure> {
    let mut reporters: Vec<Arc<dyn EventReporter>> = Vec::with_capacity(settings.len());
    for reporter in settings {
        match reporter {
            ReporterSettings::Slack(slack) => {
                info!("Reporting events to Slack");
                reporters.push(Arc::new(SlackReporter::new(slack)?));
            }
        }
    }
    Ok(ReporterSet::new(reporters))
}
