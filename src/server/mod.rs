//! HTTP layer: a thin axum surface over the orchestration core.

use crate::config::Config;
use crate::registry::CapabilityRegistry;
use crate::scheduler::Scheduler;
use crate::storage::ArtifactStorage;
use alembic_backends::ToolRegistry;
use alembic_common::Error;
use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, StatusCode},
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod routes_api;
pub mod routes_speech;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub scheduler: Scheduler,
    pub registry: Arc<CapabilityRegistry>,
    pub storage: Arc<ArtifactStorage>,
    pub tools: Arc<ToolRegistry>,
    pub config: Arc<Config>,
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes_api::health))
        .nest(
            "/api",
            routes_api::api_routes().merge(routes_speech::speech_routes()),
        )
        .layer(DefaultBodyLimit::max(ctx.config.limits.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Start the HTTP server and block until shutdown.
pub async fn start_server(ctx: AppContext) -> Result<()> {
    let addr: SocketAddr =
        format!("{}:{}", ctx.config.server.host, ctx.config.server.port).parse()?;

    let app = create_router(ctx);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}

/// JSON error body + status for the unified error type.
pub(crate) fn error_response(err: &Error) -> (StatusCode, Json<serde_json::Value>) {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(serde_json::json!({
            "success": false,
            "error": err.to_string(),
        })),
    )
}

pub(crate) fn bad_request(message: impl Into<String>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "success": false,
            "error": message.into(),
        })),
    )
}
