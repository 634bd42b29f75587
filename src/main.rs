//! Game Gallery Back binary entrypoint wiring REST, SSE, the remote document store and the enrichment loop.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use game_gallery_back::{
    config::{AppConfig, StoreBackend},
    dao::{
        document_store::{
            DocumentStore, github::GithubDocumentStore, memory::InMemoryDocumentStore,
        },
        storefront::steam::SteamStorefront,
    },
    routes,
    services::{enrichment, library_service},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let credentials = config.initial_credentials();

    let store: Arc<dyn DocumentStore> = match config.backend {
        StoreBackend::Github => Arc::new(
            GithubDocumentStore::new(config.github.clone(), credentials.clone())
                .context("building github document store")?,
        ),
        StoreBackend::Memory => Arc::new(InMemoryDocumentStore::new()),
    };
    let storefront = Arc::new(
        SteamStorefront::new(config.storefront.clone()).context("building storefront client")?,
    );

    let app_state = AppState::new(config, store, storefront, credentials);

    tokio::spawn(initial_load(app_state.clone()));
    tokio::spawn(enrichment::run(app_state.clone()));

    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal(app_state))
        .await
        .context("serving axum")?;

    Ok(())
}

/// Load the library once at startup; an unconfigured or unreachable store leaves the session empty.
async fn initial_load(state: SharedState) {
    if !state.store().is_configured().await {
        info!("store credentials not configured; waiting for settings");
        return;
    }
    match library_service::load(&state).await {
        Ok(outcome) => info!(
            games = outcome.games.len(),
            migrated = outcome.migrated,
            "library loaded"
        ),
        Err(err) => warn!(error = %err, "initial library load failed"),
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM, then close the session so background work stops.
async fn shutdown_signal(state: SharedState) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutting down");
    state.session().shutdown();
}
