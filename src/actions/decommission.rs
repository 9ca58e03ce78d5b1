use super::{
    http_client, send_checked, ActionError, RequestFailure, ACTION_TIMEOUT, CALLER,
    FORWARDED_USER_HEADER,
};
use crate::config::ActionEndpoint;
use crate::search::{Resource, ResourceStatus};
use async_trait::async_trait;
use serde_json::json;

/// Moves a resource into the `decom` status.
#[async_trait]
pub trait Decommissioner: Send + Sync {
    async fn decommission(&self, resource: &Resource) -> Result<(), ActionError>;
}

pub struct HttpDecommissioner {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl HttpDecommissioner {
    pub fn new(api: &ActionEndpoint) -> Result<Self, RequestFailure> {
        Ok(Self {
            client: http_client(ACTION_TIMEOUT)?,
            endpoint: api.endpoint.trim_end_matches('/').to_string(),
            token: api.token.clone(),
        })
    }
}

#[async_trait]
impl Decommissioner for HttpDecommissioner {
    async fn decommission(&self, resource: &Resource) -> Result<(), ActionError> {
        if resource.org.is_empty() {
            return Err(ActionError::MissingOrg(resource.id.clone()));
        }

        let url = format!("{}/{}/{}/status", self.endpoint, resource.org, resource.id);
        let request = self
            .client
            .put(&url)
            .header(FORWARDED_USER_HEADER, CALLER)
            .header("Auth-Token", &self.token)
            .json(&json!({ "status": ResourceStatus::Decom.as_str() }));

        send_checked(request)
            .await
            .map(|_| ())
            .map_err(|failure| ActionError::Request {
                action: "decommission",
                id: resource.id.clone(),
                failure,
            })
    }
}
