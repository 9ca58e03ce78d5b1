//! Elasticsearch-backed resource lookup.

use super::query::{build_bool_query, DateRangeQuery};
use super::resource::Resource;
use super::QueryError;
use crate::config::SearchSettings;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

/// Hard cap on hits fetched per query.
pub const MAX_RESULTS: usize = 1000;

/// Looks resources up in the search backend.
#[async_trait]
pub trait ResourceFinder: Send + Sync {
    /// Every resource matching all of `queries`, up to [`MAX_RESULTS`].
    async fn find(&self, queries: &[DateRangeQuery]) -> Result<Vec<Resource>, QueryError>;

    /// A single resource by its backend id.
    async fn get(&self, id: &str) -> Result<Resource, QueryError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    took: u64,
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: Value,
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source", default)]
    source: Value,
}

pub struct ElasticsearchFinder {
    client: reqwest::Client,
    endpoint: String,
    index: String,
    doc_type: String,
}

impl ElasticsearchFinder {
    pub fn new(settings: &SearchSettings, index: &str) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| QueryError::Connection(err.to_string()))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            index: index.to_string(),
            doc_type: settings.doc_type.clone(),
        })
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, QueryError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(QueryError::Backend {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .await
            .map_err(|err| QueryError::Malformed(err.to_string()))
    }
}

#[async_trait]
impl ResourceFinder for ElasticsearchFinder {
    async fn find(&self, queries: &[DateRangeQuery]) -> Result<Vec<Resource>, QueryError> {
        let query = build_bool_query(queries)?;
        let url = format!("{}/{}/_search", self.endpoint, self.index);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "query": query, "size": MAX_RESULTS }))
            .send()
            .await?;
        let result: SearchResponse = Self::read_json(response).await?;

        debug!(
            "Query took {} milliseconds, {} hits",
            result.took,
            result.hits.hits.len()
        );

        let mut resources = Vec::with_capacity(result.hits.hits.len());
        for hit in result.hits.hits {
            match serde_json::from_value::<Resource>(hit.source) {
                Ok(mut resource) => {
                    resource.id = hit.id;
                    resources.push(resource);
                }
                Err(err) => {
                    error!(
                        "Couldn't deserialize hit {} into a resource: {}",
                        hit.id, err
                    );
                }
            }
        }
        Ok(resources)
    }

    async fn get(&self, id: &str) -> Result<Resource, QueryError> {
        let url = format!(
            "{}/{}/{}/{}",
            self.endpoint,
            self.index,
            self.doc_type,
            urlencoding::encode(id)
        );

        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(QueryError::NotFound(id.to_string()));
        }

        let document: GetResponse = Self::read_json(response).await?;
        if !document.found {
            return Err(QueryError::NotFound(id.to_string()));
        }

        let mut resource: Resource = serde_json::from_value(document.source)
            .map_err(|err| QueryError::Malformed(err.to_string()))?;
        resource.id = document.id;
        Ok(resource)
    }
}
