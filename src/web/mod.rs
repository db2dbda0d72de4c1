pub mod handlers;
pub mod pages;

use crate::config::Config;
use crate::detector::PhishingDetector;
use crate::statistics::StatisticsCollector;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

#[derive(Clone)]
pub struct AppState {
    pub detector: PhishingDetector,
    pub config: Arc<Config>,
    pub stats: Arc<StatisticsCollector>,
}

impl AppState {
    pub fn new(detector: PhishingDetector, config: Config) -> Self {
        Self {
            detector,
            config: Arc::new(config),
            stats: Arc::new(StatisticsCollector::new()),
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized,
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            AppError::BadRequest(s) => (StatusCode::BAD_REQUEST, s),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Missing or invalid API credentials".to_string(),
            ),
            AppError::Internal(e) => {
                log::error!("Internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": msg }))).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e)
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_kb * 1024;
    Router::new()
        .route(
            "/",
            get(handlers::detect_url_form).post(handlers::detect_url_submit),
        )
        .route("/api/check-phishing/", post(handlers::check_phishing))
        .route("/api/check-phishing", post(handlers::check_phishing))
        .route(
            "/scan-inbox/",
            get(handlers::scan_inbox_form).post(handlers::scan_inbox_submit),
        )
        .route(
            "/scan-inbox",
            get(handlers::scan_inbox_form).post(handlers::scan_inbox_submit),
        )
        .route("/health", get(handlers::health))
        .route("/api/stats", get(handlers::stats))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(body_limit))
}

pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = state.config.bind_addr().parse()?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("phishguard listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("Failed to listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
            log::info!("Received shutdown signal, shutting down gracefully");
        })
        .await?;

    Ok(())
}
