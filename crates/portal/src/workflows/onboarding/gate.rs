use super::domain::{Identity, Profile, SectionKind};
use super::repository::{ProfileRepository, RepositoryError};
use super::resolver::CompletionResolver;

/// Why a guard refused to run the wrapped handler.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("authentication required")]
    NotAuthenticated,
    #[error("no profile is linked to this identity")]
    NoProfile,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Resolves the caller's profile, failing closed: a missing identity and an
/// identity without a linked profile both short-circuit with a denial
/// instead of surfacing as a lookup failure downstream.
pub fn require_profile<R>(
    repository: &R,
    identity: Option<&Identity>,
) -> Result<Profile, GateError>
where
    R: ProfileRepository,
{
    let identity = identity.ok_or(GateError::NotAuthenticated)?;
    repository
        .fetch_profile(&identity.username)?
        .ok_or(GateError::NoProfile)
}

/// Setup-step guard: runs `handler` only while the section is still unset,
/// otherwise hands control to `on_already_set`. Keeps a completed step from
/// being re-submitted through its original form.
pub fn with_unset_section<R, T>(
    resolver: &CompletionResolver<R>,
    profile: &Profile,
    kind: SectionKind,
    on_already_set: impl FnOnce(SectionKind) -> T,
    handler: impl FnOnce() -> T,
) -> Result<T, GateError>
where
    R: ProfileRepository,
{
    if resolver.has_section(&profile.id, kind)? {
        Ok(on_already_set(kind))
    } else {
        Ok(handler())
    }
}

/// Completed-setup guard: runs `handler` only once every registered section
/// exists, otherwise hands the first incomplete section to `on_incomplete`.
/// Keeps post-setup features out of reach until onboarding is finished.
pub fn with_setup_completed<R, T>(
    resolver: &CompletionResolver<R>,
    profile: &Profile,
    on_incomplete: impl FnOnce(SectionKind) -> T,
    handler: impl FnOnce() -> T,
) -> Result<T, GateError>
where
    R: ProfileRepository,
{
    match resolver.first_incomplete_section(&profile.id)? {
        Some(kind) => Ok(on_incomplete(kind)),
        None => Ok(handler()),
    }
}
