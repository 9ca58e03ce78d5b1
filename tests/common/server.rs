//! Test reaper lifecycle management
//!
//! Each test gets its own reaper: the HTTP server on a random port plus a
//! batch scheduler, both talking to the same in-memory fleet.

use super::constants::*;
use super::fakes::Fleet;
use super::fixtures::{fleet_collaborators, test_config};
use reaper::config::AppConfig;
use reaper::lifecycle::{LifecycleEvaluator, PhaseReport};
use reaper::renewal::RenewalService;
use reaper::scheduler::{default_phases, BatchScheduler};
use reaper::server::{make_app, run_server, ServerConfig, ServerState};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Test reaper instance
///
/// When dropped, the shutdown token is cancelled and the server stops.
pub struct TestServer {
    /// Base URL of the API (e.g., "http://127.0.0.1:12345/v1/reaper")
    pub base_url: String,

    pub fleet: Arc<Fleet>,

    pub config: AppConfig,

    pub scheduler: Arc<BatchScheduler>,

    /// Process-wide token, cancelled by `/shutdown`
    pub shutdown: CancellationToken,
}

impl TestServer {
    /// Spawns a reaper over `fleet` with a scheduler ticking every `interval`.
    /// Ticks can always be forced with [`TestServer::run_tick`].
    ///
    /// # Panics
    ///
    /// Panics if port binding fails or the server doesn't become ready.
    pub async fn spawn_with_interval(fleet: Fleet, interval: Duration) -> Self {
        let fleet = Arc::new(fleet);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}/v1/reaper", port);

        let config = test_config(&base_url);
        let collaborators = fleet_collaborators(&fleet);
        let shutdown = CancellationToken::new();

        let evaluator = Arc::new(LifecycleEvaluator::new(&config, collaborators.clone()));
        let mut scheduler = BatchScheduler::new(
            evaluator,
            interval,
            Duration::from_secs(1),
            shutdown.clone(),
        );
        for phase in default_phases() {
            scheduler.register_phase(phase);
        }

        let renewal = Arc::new(RenewalService::new(&config, &collaborators));
        let state = ServerState::new(ServerConfig::from(&config), renewal, shutdown.clone());
        let app = make_app(state);

        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            run_server(listener, app, server_shutdown)
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            fleet,
            config,
            scheduler: Arc::new(scheduler),
            shutdown,
        };

        server.wait_for_ready().await;

        server
    }

    /// Spawns a reaper whose scheduler never ticks on its own.
    pub async fn spawn(fleet: Fleet) -> Self {
        Self::spawn_with_interval(fleet, Duration::from_secs(3600)).await
    }

    /// Runs the three phases once, as a scheduler tick would.
    pub async fn run_tick(&self) -> Vec<PhaseReport> {
        self.scheduler
            .run_tick_now()
            .await
            .expect("Tick should not panic")
    }

    /// Waits for the server to become ready by polling `/ping`
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/ping", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
