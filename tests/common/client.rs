//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per reaper endpoint. When routes change,
//! update only this file.

use super::constants::*;
use reqwest::Response;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// Base URL of the API, including `/v1/reaper`
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    pub async fn ping(&self) -> Response {
        self.get("/ping").await
    }

    pub async fn version(&self) -> Response {
        self.get("/version").await
    }

    pub async fn metrics(&self) -> Response {
        self.get("/metrics").await
    }

    pub async fn shutdown(&self) -> Response {
        self.client
            .post(format!("{}/shutdown", self.base_url))
            .send()
            .await
            .expect("Shutdown request failed")
    }

    /// Renew `id` with every token in `tokens`, in order.
    pub async fn renew(&self, id: &str, tokens: &[&str]) -> Response {
        let query: Vec<(&str, &str)> = tokens.iter().map(|token| ("token", *token)).collect();
        self.client
            .get(format!("{}/renew/{}", self.base_url, id))
            .query(&query)
            .send()
            .await
            .expect("Renew request failed")
    }

    /// Follow a renewal link exactly as it was sent to the owner.
    pub async fn follow(&self, link: &str) -> Response {
        self.client
            .get(link)
            .send()
            .await
            .expect("Request to renewal link failed")
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("Request failed")
    }
}
