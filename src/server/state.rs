use axum::extract::FromRef;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::ServerConfig;
use crate::renewal::RenewalService;

pub type GuardedRenewalService = Arc<RenewalService>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub version: String,
    pub githash: String,
    pub buildstamp: String,
}

impl VersionInfo {
    /// Version of the running binary, as stamped by the build script.
    pub fn current() -> Self {
        VersionInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            githash: env!("GIT_HASH").to_string(),
            buildstamp: env!("BUILD_STAMP").to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub renewal: GuardedRenewalService,
    pub version: VersionInfo,
    /// Cancelled by `/shutdown`; the whole process listens to it.
    pub shutdown: CancellationToken,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        renewal: GuardedRenewalService,
        shutdown: CancellationToken,
    ) -> ServerState {
        ServerState {
            config,
            renewal,
            version: VersionInfo::current(),
            shutdown,
        }
    }
}

impl FromRef<ServerState> for GuardedRenewalService {
    fn from_ref(input: &ServerState) -> Self {
        input.renewal.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for CancellationToken {
    fn from_ref(input: &ServerState) -> Self {
        input.shutdown.clone()
    }
}
