use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;

use portal::workflows::onboarding::{
    portal_router, NotificationSink, PortalState, ProfileRepository, SessionStore,
};
use portal::workflows::roster::roster_router;

/// Assembles the full application router: the portal and administrative
/// routes plus the operational endpoints.
pub(crate) fn with_portal_routes<R, N, S>(state: PortalState<R, N, S>) -> axum::Router
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    portal_router(state.clone())
        .merge(roster_router(state))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
