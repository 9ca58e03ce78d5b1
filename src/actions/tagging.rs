use super::{
    http_client, send_checked, RequestFailure, TagError, ACTION_TIMEOUT, CALLER,
    FORWARDED_USER_HEADER,
};
use crate::config::ActionEndpoint;
use crate::search::Resource;
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

/// Writes tags back onto a resource.
#[async_trait]
pub trait Tagger: Send + Sync {
    async fn tag(
        &self,
        resource: &Resource,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), TagError>;
}

pub struct HttpTagger {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl HttpTagger {
    pub fn new(api: &ActionEndpoint) -> Result<Self, RequestFailure> {
        Ok(Self {
            client: http_client(ACTION_TIMEOUT)?,
            endpoint: api.endpoint.trim_end_matches('/').to_string(),
            token: api.token.clone(),
        })
    }
}

#[async_trait]
impl Tagger for HttpTagger {
    async fn tag(
        &self,
        resource: &Resource,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), TagError> {
        if resource.org.is_empty() {
            return Err(TagError::MissingOrg(resource.id.clone()));
        }

        let url = format!("{}/{}/{}/tags", self.endpoint, resource.org, resource.id);
        debug!("Tagging {} with {:?}", resource.id, tags);

        let request = self
            .client
            .put(&url)
            .header(FORWARDED_USER_HEADER, CALLER)
            .header("X-Auth-Token", &self.token)
            .json(&json!({ "tags": tags }));

        send_checked(request)
            .await
            .map(|_| ())
            .map_err(|failure| TagError::Request {
                id: resource.id.clone(),
                failure,
            })
    }
}
