use super::{
    http_client, send_checked, ActionError, RequestFailure, ACTION_TIMEOUT, CALLER,
    FORWARDED_USER_HEADER,
};
use crate::config::ActionEndpoint;
use crate::search::Resource;
use async_trait::async_trait;

/// Permanently deletes a resource.
#[async_trait]
pub trait Destroyer: Send + Sync {
    async fn destroy(&self, resource: &Resource) -> Result<(), ActionError>;
}

pub struct HttpDestroyer {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl HttpDestroyer {
    pub fn new(api: &ActionEndpoint) -> Result<Self, RequestFailure> {
        Ok(Self {
            client: http_client(ACTION_TIMEOUT)?,
            endpoint: api.endpoint.trim_end_matches('/').to_string(),
            token: api.token.clone(),
        })
    }
}

#[async_trait]
impl Destroyer for HttpDestroyer {
    async fn destroy(&self, resource: &Resource) -> Result<(), ActionError> {
        if resource.org.is_empty() {
            return Err(ActionError::MissingOrg(resource.id.clone()));
        }

        let url = format!("{}/{}/{}", self.endpoint, resource.org, resource.id);
        let request = self
            .client
            .delete(&url)
            .header(FORWARDED_USER_HEADER, CALLER)
            .header("Auth-Token", &self.token);

        send_checked(request)
            .await
            .map(|_| ())
            .map_err(|failure| ActionError::Request {
                action: "destroy",
                id: resource.id.clone(),
                failure,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingServer;
    use axum::http::StatusCode;
    use std::time::Duration;

    fn resource() -> Resource {
        Resource {
            id: "i-0123".to_string(),
            org: "ss".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn sends_delete_to_resource_url() {
        let server = RecordingServer::start(StatusCode::NO_CONTENT, "").await;
        let destroyer = HttpDestroyer::new(&ActionEndpoint {
            endpoint: format!("{}/v1/servers", server.url),
            token: "12345".to_string(),
        })
        .unwrap();

        destroyer.destroy(&resource()).await.unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "DELETE");
        assert_eq!(requests[0].path, "/v1/servers/ss/i-0123");
        assert_eq!(requests[0].header("auth-token"), Some("12345"));
    }

    #[tokio::test]
    async fn slow_api_times_out() {
        let server =
            RecordingServer::start_with_delay(StatusCode::OK, "", Duration::from_millis(500)).await;
        let mut destroyer = HttpDestroyer::new(&ActionEndpoint {
            endpoint: server.url.clone(),
            token: String::new(),
        })
        .unwrap();
        destroyer.client = http_client(Duration::from_millis(50)).unwrap();

        assert!(matches!(
            destroyer.destroy(&resource()).await,
            Err(ActionError::Request {
                failure: RequestFailure::Timeout,
                ..
            })
        ));
    }
}
