use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;

use super::domain::{CvDocument, Identity, Profile, SectionData, SectionKind};
use super::gate::{self, GateError};
use super::intake::RegistrationSubmission;
use super::repository::{NotificationSink, ProfileRepository, RepositoryError};
use super::service::{OnboardingService, OnboardingError, ProfileUpdate, SectionOutcome, SetupState};
use super::sessions::SessionStore;

const SETUP_URL: &str = "/api/v1/setup";
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Shared state for the portal routes: the onboarding service plus the
/// session store that turns bearer tokens back into identities.
pub struct PortalState<R, N, S> {
    pub service: Arc<OnboardingService<R, N>>,
    pub sessions: Arc<S>,
}

impl<R, N, S> Clone for PortalState<R, N, S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            sessions: self.sessions.clone(),
        }
    }
}

/// Router builder exposing registration, the setup wizard, the edit
/// endpoints, RSVP, and CV download.
pub fn portal_router<R, N, S>(state: PortalState<R, N, S>) -> Router
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    Router::new()
        .route("/api/v1/register", post(register_handler::<R, N, S>))
        .route("/api/v1/login", post(login_handler::<R, N, S>))
        .route("/api/v1/logout", post(logout_handler::<R, N, S>))
        .route("/api/v1/portal", get(portal_handler::<R, N, S>))
        .route("/api/v1/setup", get(setup_dispatch_handler::<R, N, S>))
        .route("/api/v1/setup/cv", post(setup_cv_handler::<R, N, S>))
        .route("/api/v1/setup/:slug", post(setup_section_handler::<R, N, S>))
        .route(
            "/api/v1/edit",
            get(edit_view_handler::<R, N, S>).put(edit_profile_handler::<R, N, S>),
        )
        .route("/api/v1/edit/password", post(password_handler::<R, N, S>))
        .route("/api/v1/edit/cv", put(edit_cv_handler::<R, N, S>))
        .route("/api/v1/edit/:slug", put(edit_section_handler::<R, N, S>))
        .route("/api/v1/rsvp", post(rsvp_handler::<R, N, S>))
        .route("/cvs/:filename", get(cv_download_handler::<R, N, S>))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PasswordChangeRequest {
    current_password: String,
    new_password: String,
    confirmation: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RsvpRequest {
    going: bool,
}

pub(crate) fn bearer_identity<S>(sessions: &S, headers: &HeaderMap) -> Option<Identity>
where
    S: SessionStore,
{
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    sessions.resolve(token.trim())
}

fn denial(error: GateError) -> Response {
    match error {
        GateError::NotAuthenticated => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "authentication required" })),
        )
            .into_response(),
        GateError::NoProfile => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "no profile is linked to this identity" })),
        )
            .into_response(),
        GateError::Repository(err) => internal_error(err),
    }
}

fn internal_error(err: impl std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}

/// The alternative every gated setup/edit view falls back to: back to the
/// setup dispatcher, which presents the next open step.
fn see_other_setup() -> Response {
    (StatusCode::SEE_OTHER, [(header::LOCATION, SETUP_URL)]).into_response()
}

fn service_error(error: OnboardingError) -> Response {
    let status = match &error {
        OnboardingError::Intake(_) => StatusCode::UNPROCESSABLE_ENTITY,
        OnboardingError::UsernameTaken | OnboardingError::AlreadyRegistered => StatusCode::CONFLICT,
        OnboardingError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        OnboardingError::NotApproved => StatusCode::FORBIDDEN,
        OnboardingError::UnknownProfile(_)
        | OnboardingError::SectionNotSet(_)
        | OnboardingError::NotInSequence(_) => StatusCode::NOT_FOUND,
        OnboardingError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        OnboardingError::Repository(_)
        | OnboardingError::Notification(_)
        | OnboardingError::Credentials(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

/// Resolves the caller to an authenticated identity with a linked profile,
/// or produces the appropriate denial response.
fn authorize<R, N, S>(
    state: &PortalState<R, N, S>,
    headers: &HeaderMap,
) -> Result<(Identity, Profile), Response>
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    let identity = bearer_identity(state.sessions.as_ref(), headers);
    let profile = gate::require_profile(state.service.repository().as_ref(), identity.as_ref())
        .map_err(denial)?;
    let identity = identity.ok_or_else(|| denial(GateError::NotAuthenticated))?;
    Ok((identity, profile))
}

fn decode_section_payload(
    kind: SectionKind,
    value: serde_json::Value,
) -> Result<SectionData, serde_json::Error> {
    match kind {
        SectionKind::Academic => serde_json::from_value(value).map(SectionData::Academic),
        SectionKind::Application => serde_json::from_value(value).map(SectionData::Application),
        SectionKind::Organizational => {
            serde_json::from_value(value).map(SectionData::Organizational)
        }
        SectionKind::Cv => serde_json::from_value(value).map(SectionData::Cv),
        SectionKind::Rsvp => serde_json::from_value(value).map(SectionData::Rsvp),
        SectionKind::Approval => serde_json::from_value(value).map(SectionData::Approval),
    }
}

async fn register_handler<R, N, S>(
    State(state): State<PortalState<R, N, S>>,
    Json(submission): Json<RegistrationSubmission>,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    let today = Local::now().date_naive();
    match state.service.register(submission, today) {
        Ok((profile, identity)) => {
            let token = state.sessions.issue(identity);
            (
                StatusCode::CREATED,
                Json(json!({
                    "username": profile.username,
                    "profile_id": profile.id,
                    "token": token,
                    "next": SETUP_URL,
                })),
            )
                .into_response()
        }
        Err(error) => service_error(error),
    }
}

async fn login_handler<R, N, S>(
    State(state): State<PortalState<R, N, S>>,
    Json(request): Json<LoginRequest>,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    match state
        .service
        .authenticate(&request.username, &request.password)
    {
        Ok(identity) => {
            let is_admin = identity.is_admin;
            let token = state.sessions.issue(identity);
            (
                StatusCode::OK,
                Json(json!({
                    "username": request.username,
                    "is_admin": is_admin,
                    "token": token,
                })),
            )
                .into_response()
        }
        Err(error) => service_error(error),
    }
}

async fn logout_handler<R, N, S>(
    State(state): State<PortalState<R, N, S>>,
    headers: HeaderMap,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        if let Some(token) = value.strip_prefix("Bearer ") {
            state.sessions.revoke(token.trim());
        }
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn portal_handler<R, N, S>(
    State(state): State<PortalState<R, N, S>>,
    headers: HeaderMap,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    let (_, profile) = match authorize(&state, &headers) {
        Ok(authorized) => authorized,
        Err(response) => return response,
    };

    match state.service.overview(&profile) {
        Ok(overview) => (StatusCode::OK, Json(overview)).into_response(),
        Err(error) => service_error(error),
    }
}

async fn setup_dispatch_handler<R, N, S>(
    State(state): State<PortalState<R, N, S>>,
    headers: HeaderMap,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    let (_, profile) = match authorize(&state, &headers) {
        Ok(authorized) => authorized,
        Err(response) => return response,
    };

    match state.service.next_step(&profile) {
        Ok(SetupState::Finished) => {
            (StatusCode::OK, Json(json!({ "status": "finished" }))).into_response()
        }
        Ok(SetupState::Pending { section }) => (
            StatusCode::OK,
            Json(json!({
                "status": "pending",
                "section": section,
                "submit": format!("{SETUP_URL}/{}", section.kind.slug()),
            })),
        )
            .into_response(),
        Err(error) => service_error(error),
    }
}

async fn setup_section_handler<R, N, S>(
    State(state): State<PortalState<R, N, S>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Value>,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    let (_, profile) = match authorize(&state, &headers) {
        Ok(authorized) => authorized,
        Err(response) => return response,
    };

    let Some(descriptor) = state.service.registry().by_slug(&slug).copied() else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown setup section '{slug}'") })),
        )
            .into_response();
    };

    let data = match decode_section_payload(descriptor.kind, payload) {
        Ok(data) => data,
        Err(error) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response()
        }
    };

    submit_gated(&state, &profile, data)
}

async fn setup_cv_handler<R, N, S>(
    State(state): State<PortalState<R, N, S>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    let (_, profile) = match authorize(&state, &headers) {
        Ok(authorized) => authorized,
        Err(response) => return response,
    };

    let cv = match read_cv_upload(multipart).await {
        Ok(cv) => cv,
        Err(response) => return response,
    };

    submit_gated(&state, &profile, SectionData::Cv(cv))
}

/// Shared setup-step submission path: the unset-section gate falls back to
/// the dispatcher when the step was already completed, and a lost creation
/// race resolves to the same redirect.
fn submit_gated<R, N, S>(
    state: &PortalState<R, N, S>,
    profile: &Profile,
    data: SectionData,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    let kind = data.kind();
    let outcome = gate::with_unset_section(
        state.service.resolver(),
        profile,
        kind,
        |_| see_other_setup(),
        || match state.service.submit_section(profile, data) {
            Ok(SectionOutcome::Created(_) | SectionOutcome::AlreadyComplete(_)) => {
                see_other_setup()
            }
            Ok(SectionOutcome::Updated(_)) => see_other_setup(),
            Err(error) => service_error(error),
        },
    );

    match outcome {
        Ok(response) => response,
        Err(error) => denial(error),
    }
}

async fn read_cv_upload(mut multipart: Multipart) -> Result<CvDocument, Response> {
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response()
    })? {
        if field.name() != Some("cv") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .map(|value| value.to_string())
            .unwrap_or_else(|| mime::APPLICATION_PDF.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|err| {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "error": err.to_string() })),
                )
                    .into_response()
            })?
            .to_vec();

        return Ok(CvDocument {
            filename,
            content_type,
            data,
        });
    }

    // No file attached: the step still completes, just without a document.
    Ok(CvDocument {
        filename: String::new(),
        content_type: String::new(),
        data: Vec::new(),
    })
}

async fn edit_view_handler<R, N, S>(
    State(state): State<PortalState<R, N, S>>,
    headers: HeaderMap,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    let (_, profile) = match authorize(&state, &headers) {
        Ok(authorized) => authorized,
        Err(response) => return response,
    };

    let outcome = gate::with_setup_completed(
        state.service.resolver(),
        &profile,
        |_| see_other_setup(),
        || (StatusCode::OK, Json(&profile)).into_response(),
    );

    match outcome {
        Ok(response) => response,
        Err(error) => denial(error),
    }
}

async fn edit_profile_handler<R, N, S>(
    State(state): State<PortalState<R, N, S>>,
    headers: HeaderMap,
    Json(update): Json<ProfileUpdate>,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    let (_, profile) = match authorize(&state, &headers) {
        Ok(authorized) => authorized,
        Err(response) => return response,
    };

    let outcome = gate::with_setup_completed(
        state.service.resolver(),
        &profile,
        |_| see_other_setup(),
        || match state.service.update_profile(&profile, update) {
            Ok(updated) => (
                StatusCode::OK,
                Json(json!({ "message": "changes saved", "profile": updated })),
            )
                .into_response(),
            Err(error) => service_error(error),
        },
    );

    match outcome {
        Ok(response) => response,
        Err(error) => denial(error),
    }
}

async fn edit_section_handler<R, N, S>(
    State(state): State<PortalState<R, N, S>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Value>,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    let (_, profile) = match authorize(&state, &headers) {
        Ok(authorized) => authorized,
        Err(response) => return response,
    };

    let Some(descriptor) = state.service.registry().by_slug(&slug).copied() else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown section '{slug}'") })),
        )
            .into_response();
    };

    let data = match decode_section_payload(descriptor.kind, payload) {
        Ok(data) => data,
        Err(error) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response()
        }
    };

    edit_gated(&state, &profile, data)
}

async fn edit_cv_handler<R, N, S>(
    State(state): State<PortalState<R, N, S>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    let (_, profile) = match authorize(&state, &headers) {
        Ok(authorized) => authorized,
        Err(response) => return response,
    };

    let cv = match read_cv_upload(multipart).await {
        Ok(cv) => cv,
        Err(response) => return response,
    };

    edit_gated(&state, &profile, SectionData::Cv(cv))
}

fn edit_gated<R, N, S>(
    state: &PortalState<R, N, S>,
    profile: &Profile,
    data: SectionData,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    let outcome = gate::with_setup_completed(
        state.service.resolver(),
        profile,
        |_| see_other_setup(),
        || match state.service.edit_section(profile, data) {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({ "message": "changes saved" })),
            )
                .into_response(),
            Err(error) => service_error(error),
        },
    );

    match outcome {
        Ok(response) => response,
        Err(error) => denial(error),
    }
}

async fn password_handler<R, N, S>(
    State(state): State<PortalState<R, N, S>>,
    headers: HeaderMap,
    Json(request): Json<PasswordChangeRequest>,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    let (identity, profile) = match authorize(&state, &headers) {
        Ok(authorized) => authorized,
        Err(response) => return response,
    };

    let outcome = gate::with_setup_completed(
        state.service.resolver(),
        &profile,
        |_| see_other_setup(),
        || {
            match state.service.change_password(
                &identity,
                &request.current_password,
                &request.new_password,
                &request.confirmation,
            ) {
                Ok(()) => (
                    StatusCode::OK,
                    Json(json!({ "message": "your password was successfully updated" })),
                )
                    .into_response(),
                Err(error) => service_error(error),
            }
        },
    );

    match outcome {
        Ok(response) => response,
        Err(error) => denial(error),
    }
}

async fn rsvp_handler<R, N, S>(
    State(state): State<PortalState<R, N, S>>,
    headers: HeaderMap,
    Json(request): Json<RsvpRequest>,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    let (_, profile) = match authorize(&state, &headers) {
        Ok(authorized) => authorized,
        Err(response) => return response,
    };

    let outcome = gate::with_setup_completed(
        state.service.resolver(),
        &profile,
        |_| see_other_setup(),
        || match state.service.rsvp(&profile, request.going) {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({ "message": "rsvp recorded", "going": request.going })),
            )
                .into_response(),
            Err(error) => service_error(error),
        },
    );

    match outcome {
        Ok(response) => response,
        Err(error) => denial(error),
    }
}

async fn cv_download_handler<R, N, S>(
    State(state): State<PortalState<R, N, S>>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
    S: SessionStore + 'static,
{
    let Some(identity) = bearer_identity(state.sessions.as_ref(), &headers) else {
        return denial(GateError::NotAuthenticated);
    };

    let Some(username) = filename.strip_suffix(".pdf") else {
        return StatusCode::NOT_FOUND.into_response();
    };

    // Administrators may fetch any CV; everyone else only their own.
    if !identity.is_admin && identity.username != username {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "not allowed to access this document" })),
        )
            .into_response();
    }

    match state.service.cv_for(username) {
        Ok(Some(cv)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, mime::APPLICATION_PDF.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", cv.download_name(username)),
                ),
            ],
            cv.data,
        )
            .into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(OnboardingError::UnknownProfile(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(error) => service_error(error),
    }
}
