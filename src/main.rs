use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reaper::actions::{HttpDecommissioner, HttpDestroyer, HttpNotifier, HttpTagger};
use reaper::config::{AppConfig, FileConfig};
use reaper::email::{create_mailer, MailTemplates, OwnerMailer};
use reaper::hooks::WebhookDispatcher;
use reaper::lifecycle::{Collaborators, LifecycleEvaluator, SystemClock};
use reaper::renewal::RenewalService;
use reaper::reporting::create_reporters;
use reaper::scheduler::{default_phases, BatchScheduler};
use reaper::search::create_resource_finder;
use reaper::server::{self, bind_listener, make_app, run_server, ServerConfig, ServerState};
use reaper::users::create_user_fetcher;

#[derive(Parser, Debug)]
#[clap(name = "reaper", about = "Keeps fleet resources from outliving their owners' interest")]
struct CliArgs {
    /// Path to the TOML configuration file.
    #[clap(short, long, default_value = "config/config.toml")]
    pub config: PathBuf,

    /// Print version information and exit.
    #[clap(long)]
    pub version: bool,
}

fn build_collaborators(config: &AppConfig) -> Result<Collaborators> {
    let finder = create_resource_finder(&config.search, &config.index)
        .context("Failed to create the resource finder")?;
    let users = create_user_fetcher(&config.user_datasource)
        .context("Failed to create the user fetcher")?;
    let mailer = create_mailer(config.email.as_ref()).context("Failed to create the mailer")?;
    let templates = MailTemplates::new().context("Failed to load the email templates")?;

    Ok(Collaborators {
        finder,
        tagger: Arc::new(HttpTagger::new(&config.tagging)?),
        notifier: Arc::new(HttpNotifier::new(&config.notify.api)?),
        decommissioner: Arc::new(HttpDecommissioner::new(&config.decommission.api)?),
        destroyer: Arc::new(HttpDestroyer::new(&config.destroy.api)?),
        owner_mail: Arc::new(OwnerMailer::new(
            users,
            mailer,
            templates,
            config.spinup_url.as_str(),
            config.spinup_site_url.as_str(),
        )),
        webhooks: Arc::new(WebhookDispatcher::new(&config.webhooks)?),
        reporters: create_reporters(&config.event_reporters)?,
        clock: Arc::new(SystemClock),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    if cli_args.version {
        println!(
            "reaper {} ({}, built {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_HASH"),
            env!("BUILD_STAMP")
        );
        return Ok(());
    }

    let file_config = FileConfig::load(&cli_args.config)?;
    let config = Arc::new(AppConfig::resolve(file_config)?);

    let default_level: LevelFilter = config.log_level.parse().unwrap_or(LevelFilter::INFO);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    info!("Loaded configuration from {:?}", cli_args.config);

    info!("Initializing metrics...");
    server::metrics::init_metrics();

    let collaborators = build_collaborators(&config)?;
    collaborators
        .reporters
        .info(&format!(
            "Starting reaper {} ({})",
            env!("CARGO_PKG_VERSION"),
            config.base_url
        ))
        .await;

    let evaluator = Arc::new(LifecycleEvaluator::new(&config, collaborators.clone()));
    if !evaluator.schedule().is_ordered() {
        warn!(
            "Notify ages, decommission age ({}) and destroy age ({}) are not in increasing order",
            evaluator.schedule().decommission_age(),
            evaluator.schedule().destroy_age()
        );
    }

    let shutdown = CancellationToken::new();

    let mut scheduler = BatchScheduler::new(
        evaluator,
        config.interval,
        config.shutdown_grace,
        shutdown.clone(),
    );
    for phase in default_phases() {
        scheduler.register_phase(phase);
    }

    let renewal = Arc::new(RenewalService::new(&config, &collaborators));
    let server_config = ServerConfig::from(config.as_ref());
    let listener = bind_listener(&server_config.listen).await?;
    let state = ServerState::new(server_config, renewal, shutdown.clone());
    let mut server_handle =
        tokio::spawn(run_server(listener, make_app(state), shutdown.clone()));

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received interrupt, shutting down...");
                signal_token.cancel();
            }
            Err(err) => error!("Failed to listen for the interrupt signal: {}", err),
        }
    });

    let scheduler_run = scheduler.run();
    tokio::pin!(scheduler_run);

    // Whichever stops first takes the other one down with it.
    let (scheduler_result, server_result) = tokio::select! {
        result = &mut scheduler_run => {
            shutdown.cancel();
            (result, server_handle.await)
        }
        result = &mut server_handle => {
            if !shutdown.is_cancelled() {
                error!("HTTP server stopped unexpectedly, shutting down");
                shutdown.cancel();
            }
            (scheduler_run.await, result)
        }
    };

    if let Err(err) = &scheduler_result {
        error!("Scheduler stopped: {}", err);
    }
    if let Ok(Err(err)) = &server_result {
        error!("HTTP server failed: {:#}", err);
    }
    server_result??;
    scheduler_result?;
    info!("Reaper stopped");
    Ok(())
}
