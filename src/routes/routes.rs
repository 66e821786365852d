//! Defines routes for the gallery gateway.
//!
//! ## Structure
//! - **Gallery endpoints**
//!   - `POST   /upload`       — multipart image upload (admin)
//!   - `GET    /images`       — public listing, newest first
//!   - `DELETE /images/batch` — batch delete (admin)
//!   - `DELETE /image/{key}`  — single delete (admin)
//!
//! - **Health endpoints**
//!   - `GET /healthz` — liveness
//!   - `GET /readyz`  — readiness (backend probe)
//!
//! Origin enforcement, CORS headers, and the request body limit are layered
//! on top of this router in `main`.

use crate::{
    handlers::{
        gallery_handlers::{delete_image, delete_images_batch, list_images, upload_images},
        health_handlers::{healthz, readyz},
    },
    services::storage_service::GatewayState,
};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Build and return the router for all gallery routes.
///
/// The router carries shared state (`GatewayState`) to all handlers.
pub fn routes() -> Router<GatewayState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // gallery endpoints
        .route("/upload", post(upload_images))
        .route("/images", get(list_images))
        .route("/images/batch", delete(delete_images_batch))
        .route("/image/{key}", delete(delete_image))
}
