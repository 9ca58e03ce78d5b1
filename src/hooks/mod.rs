//! Webhooks fired after lifecycle actions.
//!
//! Every configured hook carries an allow-list of actions. GET and HEAD hooks
//! get the event as `?id=&action=` parameters, the others as a JSON body.

use crate::actions::{http_client, send_checked, RequestFailure};
use crate::config::WebhookSettings;
use futures::future::join_all;
use serde::Serialize;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("unknown webhook action '{0}'")]
    UnknownAction(String),

    #[error("unsupported webhook method '{0}'")]
    UnsupportedMethod(String),

    #[error("Webhook {endpoint} failed: {failure}")]
    Request {
        endpoint: String,
        failure: RequestFailure,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    Notify,
    Decommission,
    Destroy,
}

impl EventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::Notify => "notify",
            EventAction::Decommission => "decommission",
            EventAction::Destroy => "destroy",
        }
    }
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventAction {
    type Err = WebhookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "notify" => Ok(EventAction::Notify),
            "decommission" => Ok(EventAction::Decommission),
            "destroy" => Ok(EventAction::Destroy),
            _ => Err(WebhookError::UnknownAction(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
}

impl HookMethod {
    fn as_method(&self) -> reqwest::Method {
        match self {
            HookMethod::Get => reqwest::Method::GET,
            HookMethod::Head => reqwest::Method::HEAD,
            HookMethod::Post => reqwest::Method::POST,
            HookMethod::Put => reqwest::Method::PUT,
            HookMethod::Patch => reqwest::Method::PATCH,
        }
    }

    fn uses_query(&self) -> bool {
        matches!(self, HookMethod::Get | HookMethod::Head)
    }
}

impl FromStr for HookMethod {
    type Err = WebhookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HookMethod::Get),
            "HEAD" => Ok(HookMethod::Head),
            "POST" => Ok(HookMethod::Post),
            "PUT" => Ok(HookMethod::Put),
            "PATCH" => Ok(HookMethod::Patch),
            _ => Err(WebhookError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// What happened to which resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub action: EventAction,
    pub server_id: String,
}

impl Event {
    pub fn new(action: EventAction, server_id: impl Into<String>) -> Self {
        Self {
            action,
            server_id: server_id.into(),
        }
    }
}

pub struct Webhook {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    method: HookMethod,
    actions: Vec<EventAction>,
}

impl Webhook {
    pub fn new(settings: &WebhookSettings) -> Result<Self, RequestFailure> {
        Ok(Self {
            client: http_client(WEBHOOK_TIMEOUT)?,
            endpoint: settings.endpoint.clone(),
            token: settings.token.clone(),
            method: settings.method,
            actions: settings.actions.clone(),
        })
    }

    pub fn accepts(&self, action: EventAction) -> bool {
        self.actions.contains(&action)
    }

    /// Deliver `event` if this hook listens for its action. Returns whether
    /// anything was sent.
    pub async fn send(&self, event: &Event) -> Result<bool, WebhookError> {
        if !self.accepts(event.action) {
            debug!(
                "Not sending {} event to {}, action not subscribed",
                event.action, self.endpoint
            );
            return Ok(false);
        }

        let mut request = self
            .client
            .request(self.method.as_method(), &self.endpoint);
        request = if self.method.uses_query() {
            request.query(&[
                ("id", event.server_id.as_str()),
                ("action", event.action.as_str()),
            ])
        } else {
            request.json(event)
        };
        if let Some(token) = &self.token {
            request = request.header("X-Auth-Token", token);
        }

        info!(
            "Sending {} webhook for {} to {}",
            event.action, event.server_id, self.endpoint
        );
        send_checked(request)
            .await
            .map_err(|failure| WebhookError::Request {
                endpoint: self.endpoint.clone(),
                failure,
            })?;
        Ok(true)
    }
}

/// Fans an event out to every configured hook.
#[derive(Default)]
pub struct WebhookDispatcher {
    hooks: Vec<Webhook>,
}

impl WebhookDispatcher {
    pub fn new(settings: &[WebhookSettings]) -> Result<Self, RequestFailure> {
        let hooks = settings
            .iter()
            .map(Webhook::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { hooks })
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Best-effort delivery to all hooks at once. Failures are logged and
    /// counted, never retried.
    pub async fn dispatch(&self, event: &Event) -> usize {
        let results = join_all(self.hooks.iter().map(|hook| hook.send(event))).await;
        let mut failed = 0;
        for result in results {
            if let Err(err) = result {
                warn!("{}", err);
                failed += 1;
            }
        }
        failed
    }
}
