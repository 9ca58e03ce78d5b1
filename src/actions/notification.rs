use super::{http_client, send_checked, DeliveryError, RequestFailure, ACTION_TIMEOUT};
use crate::config::ActionEndpoint;
use async_trait::async_trait;
use serde::Serialize;

/// Template parameters handed to the notification API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationParams {
    pub netid: String,
    pub link: String,
    pub expire_on: String,
    pub renewed_at: String,
    pub fqdn: String,
}

/// Delivers a renewal reminder to a resource owner.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, params: &NotificationParams) -> Result<(), DeliveryError>;
}

pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl HttpNotifier {
    pub fn new(api: &ActionEndpoint) -> Result<Self, RequestFailure> {
        Ok(Self {
            client: http_client(ACTION_TIMEOUT)?,
            endpoint: api.endpoint.clone(),
            token: api.token.clone(),
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, params: &NotificationParams) -> Result<(), DeliveryError> {
        let request = self
            .client
            .post(&self.endpoint)
            .header("Auth-Token", &self.token)
            .json(params);

        send_checked(request)
            .await
            .map(|_| ())
            .map_err(DeliveryError::Request)
    }
}
