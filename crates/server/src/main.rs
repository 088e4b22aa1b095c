//! Subcast Pulse server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use subcast_api::{AppState, router as api_router};
use subcast_common::Config;
use subcast_core::{
    ConversationDataGateway, DeletedCastArchive, FileArchive, InMemoryGraph, NeynarClient,
    PaymentProcessor, Provider, SimulatedPayments, UnlockFee, UnlockService,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Wire the provider, archive and payment processor chosen by `config`.
async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let demo = Arc::new(InMemoryGraph::demo());

    let provider: Provider = if config.has_upstream() {
        info!(base_url = %config.neynar.base_url, "Using Neynar upstream");
        Arc::new(NeynarClient::new(&config.neynar)?)
    } else {
        warn!("No Neynar API key configured, serving the demo graph");
        demo.clone()
    };

    let archive: Arc<dyn DeletedCastArchive> = match &config.unlock.archive_path {
        Some(path) => {
            let archive = FileArchive::load(path).await?;
            info!(path = %path.display(), casts = archive.len(), "Loaded deleted cast archive");
            Arc::new(archive)
        }
        None if config.has_upstream() => {
            warn!("No archive configured, every unlock will be refused");
            Arc::new(FileArchive::default())
        }
        None => demo,
    };

    let payments: Arc<dyn PaymentProcessor> = if config.unlock.decline_all {
        warn!("Simulated payments decline every charge");
        Arc::new(SimulatedPayments::declining())
    } else {
        Arc::new(SimulatedPayments::approving())
    };

    let fee = UnlockFee::from_config(&config.unlock);
    info!(amount_cents = fee.amount_cents, currency = %fee.currency, "Unlock fee");

    Ok(AppState::new(
        ConversationDataGateway::new(provider, &config.feed),
        UnlockService::new(payments, archive, fee),
    ))
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api_router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "subcast=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting subcast-pulse server...");

    let config = Config::load()?;
    let state = build_state(&config).await?;
    let app = app(state);

    let ip = config.server.host.parse::<std::net::IpAddr>()?;
    let addr = SocketAddr::new(ip, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
