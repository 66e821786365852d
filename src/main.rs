use anyhow::Result;
use axum::{Router, extract::DefaultBodyLimit, middleware};
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

mod config;
mod cors;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use handlers::gallery_handlers::{MAX_FILE_BYTES, MAX_UPLOAD_FILES};
use services::storage_service::{GatewayState, SpacesStore};

/// Headroom for multipart framing on top of the raw payload cap.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::GatewayConfig::from_env_and_args()?;

    tracing::info!(
        host = %cfg.host,
        port = cfg.port,
        bucket = %cfg.bucket,
        region = %cfg.region,
        "Starting gallery-gateway"
    );

    // --- Initialize the backend client ---
    let store = SpacesStore::new(&cfg);
    let state = GatewayState {
        store: Arc::new(store),
        admin_secret: cfg.admin_secret.clone().into(),
    };

    // --- Build router ---
    let origins = cors::AllowedOrigins::from_list(&cfg.allowed_origins);
    let app: Router = routes::routes::routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(
                    origins.clone(),
                    cors::enforce_origin,
                ))
                .layer(cors::cors_layer(origins))
                .layer(DefaultBodyLimit::max(
                    MAX_UPLOAD_FILES * MAX_FILE_BYTES + BODY_LIMIT_SLACK,
                )),
        )
        .with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
