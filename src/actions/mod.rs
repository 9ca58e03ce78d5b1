//! HTTP clients for the APIs that change resources: tagging, decommission,
//! destroy and owner notification.

mod decommission;
mod destroy;
mod notification;
mod tagging;

pub use decommission::{Decommissioner, HttpDecommissioner};
pub use destroy::{Destroyer, HttpDestroyer};
pub use notification::{HttpNotifier, NotificationParams, Notifier};
pub use tagging::{HttpTagger, Tagger};

use std::time::Duration;
use thiserror::Error;

/// Per-call timeout of every action client.
pub const ACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Name the service identifies itself with towards the action APIs.
pub const CALLER: &str = "reaper";
pub const FORWARDED_USER_HEADER: &str = "X-Forwarded-User";

/// Why an outbound request didn't come back with a 2xx.
#[derive(Debug, Error)]
pub enum RequestFailure {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<reqwest::Error> for RequestFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RequestFailure::Timeout
        } else {
            RequestFailure::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum TagError {
    #[error("resource {0} has no org")]
    MissingOrg(String),

    #[error("Failed tagging {id}: {failure}")]
    Request { id: String, failure: RequestFailure },
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("resource {0} has no org")]
    MissingOrg(String),

    #[error("Failed to {action} {id}: {failure}")]
    Request {
        action: &'static str,
        id: String,
        failure: RequestFailure,
    },
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to deliver notification: {0}")]
    Request(RequestFailure),

    #[error("Failed to send email: {0}")]
    Mail(String),

    #[error("No email address for {0}")]
    NoAddress(String),

    #[error("Failed to look up owner: {0}")]
    Owner(String),
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, RequestFailure> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| RequestFailure::Client(err.to_string()))
}

/// Send `request`, turning anything but a 2xx into a [`RequestFailure`].
pub(crate) async fn send_checked(
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, RequestFailure> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RequestFailure::Status {
        status: status.as_u16(),
        body,
    })
}
