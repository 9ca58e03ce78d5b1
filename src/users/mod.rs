//! Lookup of resource owners.

use crate::actions::{http_client, send_checked, RequestFailure, CALLER, FORWARDED_USER_HEADER};
use crate::config::UserDatasourceSettings;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct User {
    #[serde(rename = "First", default)]
    pub first: String,
    #[serde(rename = "Last", default)]
    pub last: String,
    #[serde(rename = "Email", default)]
    pub email: String,
    #[serde(rename = "NetID", default)]
    pub netid: String,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first, self.last).trim().to_string()
    }
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("no owner set on the resource")]
    NoOwner,

    #[error("Failed fetching user {id}: {failure}")]
    Request { id: String, failure: RequestFailure },

    #[error("Malformed user record for {id}: {message}")]
    Malformed { id: String, message: String },
}

#[async_trait]
pub trait UserFetcher: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<User, UserError>;
}

pub struct RestUserFetcher {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl RestUserFetcher {
    pub fn new(endpoint: &str, token: &str, timeout: Duration) -> Result<Self, RequestFailure> {
        Ok(Self {
            client: http_client(timeout)?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }
}

#[async_trait]
impl UserFetcher for RestUserFetcher {
    async fn fetch(&self, id: &str) -> Result<User, UserError> {
        if id.is_empty() {
            return Err(UserError::NoOwner);
        }

        let url = format!("{}/{}", self.endpoint, urlencoding::encode(id));
        let request = self
            .client
            .get(&url)
            .header(FORWARDED_USER_HEADER, CALLER)
            .header("Auth-Token", &self.token);

        let response = send_checked(request)
            .await
            .map_err(|failure| UserError::Request {
                id: id.to_string(),
                failure,
            })?;
        response.json().await.map_err(|err| UserError::Malformed {
            id: id.to_string(),
            message: err.to_string(),
        })
    }
}

pub fn create_user_fetcher(
    settings: &UserDatasourceSettings,
) -> Result<Arc<dyn UserFetcher>, RequestFailure> {
    match settings {
        UserDatasourceSettings::Rest {
            endpoint,
            token,
            timeout,
        } => {
            info!("Using REST user datasource at {}", endpoint);
            Ok(Arc::new(RestUserFetcher::new(endpoint, token, *timeout)?))
        }
    }
}
