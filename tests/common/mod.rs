//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{Fleet, TestClient, TestServer, REMINDED_ID};
//!
//! #[tokio::test]
//! async fn test_reminder() {
//!     let server = TestServer::spawn(Fleet::seeded()).await;
//!     server.run_tick().await;
//!
//!     let link = &server.fleet.notifications()[0].link;
//!     let response = TestClient::new(server.base_url.clone()).follow(link).await;
//!     assert!(response.status().is_success());
//! }
//! ```

#![allow(dead_code)]

mod client;
mod constants;
mod fakes;
mod fixtures;
mod server;

pub use client::TestClient;
pub use constants::*;
pub use fakes::{resource, Fleet};
pub use server::TestServer;
