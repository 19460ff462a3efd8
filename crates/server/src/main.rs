//! memehub server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, middleware};
use memehub_api::{AppState, auth_middleware, router as api_router};
use memehub_common::{Config, LocalStorage, StorageService};
use memehub_core::{ImgflipClient, NotificationHub, TemplateSourceService};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upload size plus multipart framing.
const MAX_BODY_SIZE: usize = memehub_core::MAX_UPLOAD_SIZE + 5 * 1024 * 1024;

/// How often idle notification channels are dropped.
const HUB_PRUNE_INTERVAL: Duration = Duration::from_secs(300);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
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

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "memehub=debug,tower_http=debug".into());
    let json = std::env::var("MEMEHUB_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Drop notification channels whose streams have all closed.
fn spawn_hub_pruner(hub: NotificationHub) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HUB_PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            let removed = hub.prune().await;
            if removed > 0 {
                tracing::debug!(removed, "Pruned idle notification channels");
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting memehub server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = memehub_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    memehub_db::migrate(&db).await?;
    info!("Migrations completed");

    // Media storage
    tokio::fs::create_dir_all(&config.storage.base_path).await?;
    let storage: StorageService = Arc::new(LocalStorage::new(
        config.storage.base_path.clone(),
        config.storage.base_url.clone(),
    ));
    info!(path = %config.storage.base_path.display(), "Using local media storage");

    let templates: TemplateSourceService = Arc::new(ImgflipClient::new(&config.imgflip.api_url)?);

    let state = AppState::new(Arc::new(db), &config, storage, templates)?;
    spawn_hub_pruner(state.hub.clone());

    let mut app = Router::new().nest(
        "/api",
        api_router().layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
    );

    if config.storage.base_url.starts_with('/') {
        app = app.nest_service(
            &config.storage.base_url,
            ServeDir::new(&config.storage.base_path),
        );
    }

    let app = app
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
                .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
                .layer(CompressionLayer::new()),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
