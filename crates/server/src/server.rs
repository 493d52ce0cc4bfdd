//! Server initialization and routing
//!
//! Router configuration, middleware stack and graceful shutdown. The layout
//! mirrors the API surface: public health routes, then the authenticated
//! `/api/v1` surface for reports, matches, claims and evidence images.

use crate::config::ServerConfig;
use crate::middleware::{api_key_auth, log_requests, request_id};
use crate::routes::{api_info, not_found};
use crate::routes::{claims, health, images, items, matches, notifications};
use crate::state::ServerState;
use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes and middleware
///
/// - Public routes: /, /health, /ready (no auth required)
/// - Protected routes: all /api/v1/* endpoints (API key required; user
///   identity arrives via x-user-id/x-user-role from the auth collaborator)
fn build_router(state: Arc<ServerState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let public_routes = Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics));

    let protected_routes = Router::new()
        // Reports
        .route("/api/v1/items/lost", post(items::report_lost).get(items::list_lost))
        .route(
            "/api/v1/items/found",
            post(items::report_found).get(items::list_found),
        )
        .layer(DefaultBodyLimit::max(state.config.max_body_size()))
        // Matches
        .route(
            "/api/v1/items/lost/{id}/matches",
            get(matches::matches_for_lost),
        )
        .route(
            "/api/v1/items/found/{id}/matches",
            get(matches::matches_for_found),
        )
        .route("/api/v1/items/lost/{id}/rematch", post(matches::rematch_lost))
        // Claims
        .route("/api/v1/claims", post(claims::initiate_claim))
        .route("/api/v1/claims/{id}", get(claims::get_claim))
        .route("/api/v1/claims/{id}/verify", post(claims::submit_verification))
        .route("/api/v1/claims/{id}/admin", post(claims::admin_action))
        .route("/api/v1/claims/{id}/complete", post(claims::complete_claim))
        // Evidence images
        .route("/api/v1/images/masked/{id}", get(images::masked_image))
        .route("/api/v1/images/original/{id}", get(images::original_image))
        // Notifications
        .route("/api/v1/notifications", get(notifications::list_notifications))
        // Auth boundary
        .layer(from_fn_with_state(state.clone(), api_key_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.timeout_secs,
        )))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(from_fn(request_id))
        .layer(from_fn(log_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the reclaim HTTP server.
///
/// Blocks until shutdown via SIGTERM or Ctrl+C. Initializes structured JSON
/// logging, shared state (store, ledger, claim engine, privacy gate) and the
/// router.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(false)
        .with_thread_ids(true)
        .json()
        .init();

    let state = Arc::new(ServerState::new(config.clone())?);
    let app = build_router(state);

    let addr: SocketAddr = config.socket_addr()?;

    tracing::info!(
        "Starting reclaim server on {} with {} API keys",
        addr,
        config.api_keys.len()
    );
    tracing::info!(
        "Match threshold: {}, blur sigma: {}",
        config.match_threshold,
        config.blur_sigma
    );
    tracing::info!(
        "Timeout: {}s, max body: {}MB, rate limit: {}/minute",
        config.timeout_secs,
        config.max_body_size_mb,
        config.rate_limit_per_minute
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
