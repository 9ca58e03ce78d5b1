use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use super::metrics::metrics_handler;
use super::{log_requests, state::*};
use crate::renewal::RenewalError;

async fn ping() -> &'static str {
    "pong"
}

async fn version(State(state): State<ServerState>) -> impl IntoResponse {
    Json(state.version.clone())
}

async fn shutdown(State(shutdown): State<CancellationToken>) -> impl IntoResponse {
    warn!("Shutdown requested over HTTP");
    shutdown.cancel();
    "ok"
}

impl IntoResponse for RenewalError {
    fn into_response(self) -> Response {
        match self {
            RenewalError::InvalidId(_) => StatusCode::BAD_REQUEST.into_response(),
            RenewalError::MissingToken | RenewalError::InvalidToken(_) => {
                StatusCode::FORBIDDEN.into_response()
            }
            RenewalError::Lookup(_) | RenewalError::NoOrg(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed getting details about resource",
            )
                .into_response(),
            RenewalError::Tag(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unable to process renewal, please try again later.",
            )
                .into_response(),
        }
    }
}

async fn renew(
    State(renewal_service): State<GuardedRenewalService>,
    Path(id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let tokens: Vec<String> = params
        .into_iter()
        .filter(|(key, _)| key == "token")
        .map(|(_, value)| value)
        .collect();

    let renewal = match renewal_service.renew(&id, &tokens).await {
        Ok(renewal) => renewal,
        Err(err) => return err.into_response(),
    };

    let service = renewal_service.clone();
    tokio::spawn(async move {
        if let Err(err) = service.send_confirmation(&renewal).await {
            error!(
                "Failed sending the renewal confirmation for {}: {}",
                renewal.resource.id, err
            );
        }
    });

    match renewal_service.renewal_page() {
        Ok(page) => Html(page).into_response(),
        Err(err) => {
            error!("Failed to render the renewal page: {}", err);
            Redirect::to(renewal_service.redirect_url()).into_response()
        }
    }
}

pub fn make_app(state: ServerState) -> Router {
    let public_routes: Router = Router::new()
        .route("/ping", get(ping))
        .route("/version", get(version))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state.clone());

    let reaper_routes: Router = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/shutdown", get(shutdown).post(shutdown))
        .route("/renew/{id}", get(renew))
        .with_state(state.clone());

    Router::new()
        .nest("/v1/reaper", public_routes.merge(reaper_routes))
        .layer(middleware::from_fn_with_state(
            state.config.requests_logging_level,
            log_requests,
        ))
}

/// Serve `app` on `listen` until `shutdown` is cancelled.
/// Bind the API address. Has to succeed before the scheduler starts.
pub async fn bind_listener(listen: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {}", listen))?;
    info!("Listening on {}", listener.local_addr()?);
    Ok(listener)
}

pub async fn run_server(listener: TcpListener, app: Router, shutdown: CancellationToken) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    info!("HTTP server stopped");
    Ok(())
}
