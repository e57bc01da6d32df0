use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::{build_roster, export_csv, RosterFilter};
use crate::workflows::onboarding::router::bearer_identity;
use crate::workflows::onboarding::{
    Identity, NotificationSink, OnboardingError, PortalState, ProfileRepository, SectionKind,
    SessionStore,
};

/// Router builder for the administrative endpoints: roster listing with
/// filters, approval decisions, section resets, and the CSV export.
pub fn roster_router<R, N, S>(state: PortalState<R, N, S>) -> Router
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    Router::new()
        .route("/api/v1/admin/profiles", get(list_handler::<R, N, S>))
        .route(
            "/api/v1/admin/profiles/export.csv",
            get(export_handler::<R, N, S>),
        )
        .route(
            "/api/v1/admin/profiles/:username/approval",
            put(approval_handler::<R, N, S>),
        )
        .route(
            "/api/v1/admin/profiles/:username/sections/:slug",
            delete(reset_handler::<R, N, S>),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApprovalRequest {
    approved: bool,
}

/// Administrative access check: authenticated and flagged as admin.
fn require_admin<S>(sessions: &S, headers: &HeaderMap) -> Result<Identity, Response>
where
    S: SessionStore,
{
    let Some(identity) = bearer_identity(sessions, headers) else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "authentication required" })),
        )
            .into_response());
    };

    if !identity.is_admin {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "administrator access required" })),
        )
            .into_response());
    }

    Ok(identity)
}

fn repository_error(err: impl std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}

async fn list_handler<R, N, S>(
    State(state): State<PortalState<R, N, S>>,
    Query(filter): Query<RosterFilter>,
    headers: HeaderMap,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    if let Err(response) = require_admin(state.sessions.as_ref(), &headers) {
        return response;
    }

    let rows = match build_roster(
        state.service.repository().as_ref(),
        state.service.resolver(),
    ) {
        Ok(rows) => rows,
        Err(err) => return repository_error(err),
    };

    let filtered: Vec<_> = rows.into_iter().filter(|row| filter.matches(row)).collect();
    (
        StatusCode::OK,
        Json(json!({ "count": filtered.len(), "profiles": filtered })),
    )
        .into_response()
}

async fn export_handler<R, N, S>(
    State(state): State<PortalState<R, N, S>>,
    Query(filter): Query<RosterFilter>,
    headers: HeaderMap,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    if let Err(response) = require_admin(state.sessions.as_ref(), &headers) {
        return response;
    }

    let rows = match build_roster(
        state.service.repository().as_ref(),
        state.service.resolver(),
    ) {
        Ok(rows) => rows,
        Err(err) => return repository_error(err),
    };
    let filtered: Vec<_> = rows.into_iter().filter(|row| filter.matches(row)).collect();

    match export_csv(&filtered) {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"profiles.csv\"".to_string(),
                ),
            ],
            body,
        )
            .into_response(),
        Err(err) => repository_error(err),
    }
}

async fn approval_handler<R, N, S>(
    State(state): State<PortalState<R, N, S>>,
    Path(username): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ApprovalRequest>,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    if let Err(response) = require_admin(state.sessions.as_ref(), &headers) {
        return response;
    }

    match state.service.set_approval(&username, request.approved) {
        Ok(status) => (
            StatusCode::OK,
            Json(json!({ "username": username, "approval": status.label() })),
        )
            .into_response(),
        Err(OnboardingError::UnknownProfile(_)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no profile exists for user '{username}'") })),
        )
            .into_response(),
        Err(err) => repository_error(err),
    }
}

async fn reset_handler<R, N, S>(
    State(state): State<PortalState<R, N, S>>,
    Path((username, slug)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    if let Err(response) = require_admin(state.sessions.as_ref(), &headers) {
        return response;
    }

    let Some(kind) = SectionKind::from_slug(&slug) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown section '{slug}'") })),
        )
            .into_response();
    };

    match state.service.reset_section(&username, kind) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(OnboardingError::UnknownProfile(_) | OnboardingError::SectionNotSet(_)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "nothing to reset" })),
        )
            .into_response(),
        Err(err) => repository_error(err),
    }
}
