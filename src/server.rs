//! HTTP surface of the screenshot service
//!
//! Thin axum layer over [`ScreenshotService`]: two JSON endpoints plus an
//! optional Prometheus endpoint, permissive CORS, and a fixed-window rate
//! limit applied before any browser work starts.

use crate::config::Config;
use crate::error::ScreenshotError;
use crate::metrics::{install_prometheus_recorder, Metrics};
use crate::screenshot_service::{ScreenshotRequest, ScreenshotService};
use crate::utils::RateLimiter;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{SecondsFormat, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Shared state behind every handler.
pub struct AppState {
    pub service: ScreenshotService,
    pub limiter: RateLimiter,
    /// Present only when metrics are enabled in configuration
    pub prometheus: Option<PrometheusHandle>,
    metrics: Metrics,
}

impl AppState {
    /// Builds the server state. The browser is not launched here; the first
    /// screenshot request triggers the lazy launch.
    pub fn new(config: Config) -> Result<Self, ScreenshotError> {
        // The recorder must exist before any metric handle is registered,
        // so this runs ahead of the service construction.
        let prometheus = if config.metrics_enabled {
            Some(install_prometheus_recorder()?)
        } else {
            None
        };

        let limiter = RateLimiter::new(config.rate_limit.max_requests, config.rate_limit.window);
        let service = ScreenshotService::new(config);

        Ok(Self {
            service,
            limiter,
            prometheus,
            metrics: Metrics::new(),
        })
    }
}

/// JSON error response helper
fn err_response(status: StatusCode, msg: &str) -> Response {
    (status, Json(serde_json::json!({ "error": msg }))).into_response()
}

/// Build the axum router with all endpoints and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/screenshot", post(screenshot_handler))
        .route("/health", get(health_handler));

    if state.prometheus.is_some() {
        router = router.route("/metrics", get(metrics_handler));
    }

    router.layer(cors).layer(Extension(state))
}

pub async fn screenshot_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<ScreenshotRequest>,
) -> Response {
    if !state.limiter.acquire().await {
        state.metrics.record_rate_limited();
        warn!("Rate limit exceeded, rejecting screenshot request");
        return err_response(
            StatusCode::TOO_MANY_REQUESTS,
            &ScreenshotError::RateLimited.to_string(),
        );
    }

    match state.service.take_screenshot(request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => err_response(e.status_code(), &e.to_string()),
    }
}

pub async fn health_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let browser_connected = state.service.browser_connected().await;

    Json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "browserConnected": browser_connected,
    }))
    .into_response()
}

async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    match &state.prometheus {
        Some(handle) => handle.render().into_response(),
        None => err_response(StatusCode::NOT_FOUND, "metrics disabled"),
    }
}

/// Bind the listener and serve until the shutdown channel fires, then drain
/// in-flight requests.
pub async fn run_server(
    state: Arc<AppState>,
    config: &Config,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) -> Result<(), ScreenshotError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Screenshot server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            info!("Draining in-flight requests");
        })
        .await?;

    Ok(())
}
