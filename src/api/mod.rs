//! REST API server module
//!
//! Provides an OpenAPI 3.1 compliant REST API for submitting replies,
//! inspecting recipient buffers and following delivery events.

use crate::{Config, DeliveryCoordinator, Result};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Messages
/// - `POST /messages` - Buffer a reply for a recipient
/// - `POST /messages/direct` - Chunk and deliver a reply without buffering
/// - `POST /recipients/:id/flush` - Flush a recipient's buffer now
/// - `POST /split` - Preview how a text would be chunked
///
/// ## Buffers
/// - `GET /buffers` - Status of every recipient buffer
/// - `GET /buffers/:id` - Status of one recipient buffer
///
/// ## System
/// - `GET /gate` - Delivery gate occupancy
/// - `GET /config` - Current config (secrets redacted)
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /events` - Server-sent events stream
pub fn create_router(coordinator: Arc<DeliveryCoordinator>, config: Arc<Config>) -> Router {
    let state = AppState::new(coordinator, config.clone());

    let router = Router::new()
        // Messages
        .route("/messages", post(routes::enqueue_message))
        .route("/messages/direct", post(routes::deliver_message))
        .route("/recipients/:id/flush", post(routes::flush_recipient))
        .route("/split", post(routes::split_text))
        // Buffers
        .route("/buffers", get(routes::list_buffers))
        .route("/buffers/:id", get(routes::get_buffer))
        // System
        .route("/gate", get(routes::gate_stats))
        .route("/config", get(routes::get_config))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream));

    let router = if config.api.swagger_ui {
        router.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
    } else {
        router
    };

    let router = router.with_state(state);

    let router = if config.api.api_key.is_some() {
        router.layer(middleware::from_fn_with_state(
            config.api.api_key.clone(),
            auth::require_api_key,
        ))
    } else {
        router
    };

    let router = router.layer(TraceLayer::new_for_http());

    if config.api.cors_enabled {
        let cors = build_cors_layer(&config.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` or an empty list allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the listener fails or the surrounding task is cancelled.
///
/// # Example
///
/// ```no_run
/// use reply_pacer::{Config, DeliveryCoordinator};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let coordinator = Arc::new(DeliveryCoordinator::new((*config).clone())?);
///
/// reply_pacer::api::start_api_server(coordinator, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(
    coordinator: Arc<DeliveryCoordinator>,
    config: Arc<Config>,
) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "starting API server");

    let app = create_router(coordinator, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
