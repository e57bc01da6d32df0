use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{
    Account, ApprovalDecision, ApprovalStatus, Identity, Profile, ProfileId, SectionData,
    SectionKind,
};
use super::intake::{IntakeError, IntakeGuard, IntakePolicy, RegistrationSubmission};
use super::registry::{SectionDescriptor, SectionRegistry};
use super::repository::{
    Notice, NotificationError, NotificationSink, ProfileRepository, RepositoryError, SectionRecord,
};
use super::resolver::CompletionResolver;

/// Service composing the registry, repository, resolver, and intake guard.
pub struct OnboardingService<R, N> {
    registry: Arc<SectionRegistry>,
    repository: Arc<R>,
    notifications: Arc<N>,
    intake: IntakeGuard,
    resolver: CompletionResolver<R>,
}

static PROFILE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_profile_id() -> ProfileId {
    let id = PROFILE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ProfileId(format!("prof-{id:06}"))
}

/// Where a profile stands in the setup sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum SetupState {
    Pending { section: SectionDescriptor },
    Finished,
}

/// Result of a section submission. A lost race against a concurrent
/// submission surfaces as `AlreadyComplete`, not as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionOutcome {
    Created(SectionRecord),
    Updated(SectionRecord),
    AlreadyComplete(SectionKind),
}

/// Per-section completion flag for the portal overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionStatus {
    pub kind: SectionKind,
    pub slug: &'static str,
    pub title: &'static str,
    pub completed: bool,
}

/// Everything the portal home page shows about one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileOverview {
    pub profile: Profile,
    pub full_name: String,
    pub sections: Vec<SectionStatus>,
    pub setup_completed: bool,
    pub approval: ApprovalStatus,
    pub rsvp_going: Option<bool>,
}

/// Fields of the primary profile record a user may change after setup.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ProfileUpdate {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub gender: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub country_of_residence: String,
}

/// Error raised by the onboarding service.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error("this username is already taken, please pick another")]
    UsernameTaken,
    #[error("a profile already exists for this identity or email address")]
    AlreadyRegistered,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Credentials(String),
    #[error("no profile exists for user '{0}'")]
    UnknownProfile(String),
    #[error("section '{}' is not part of the setup sequence", .0.slug())]
    NotInSequence(SectionKind),
    #[error("section '{}' has not been completed yet", .0.slug())]
    SectionNotSet(SectionKind),
    #[error("an approved application is required before responding")]
    NotApproved,
}

impl<R, N> OnboardingService<R, N>
where
    R: ProfileRepository + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(
        registry: SectionRegistry,
        repository: Arc<R>,
        notifications: Arc<N>,
        policy: IntakePolicy,
    ) -> Self {
        let registry = Arc::new(registry);
        let resolver = CompletionResolver::new(registry.clone(), repository.clone());

        Self {
            registry,
            repository,
            notifications,
            intake: IntakeGuard::new(policy),
            resolver,
        }
    }

    pub fn registry(&self) -> &SectionRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &CompletionResolver<R> {
        &self.resolver
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Creates the account and profile in one step and returns the
    /// identity to authenticate the caller with, exactly like the original
    /// registration page logged the new user in.
    pub fn register(
        &self,
        submission: RegistrationSubmission,
        today: NaiveDate,
    ) -> Result<(Profile, Identity), OnboardingError> {
        self.intake.validate_registration(&submission, today)?;

        if self
            .repository
            .fetch_account(&submission.username)?
            .is_some()
        {
            return Err(OnboardingError::UsernameTaken);
        }

        let password_hash = bcrypt::hash(&submission.password, bcrypt::DEFAULT_COST)
            .map_err(|err| OnboardingError::Credentials(err.to_string()))?;
        let account = match self.repository.create_account(Account {
            username: submission.username.clone(),
            password_hash,
            is_admin: false,
        }) {
            Ok(account) => account,
            Err(RepositoryError::Conflict) => return Err(OnboardingError::UsernameTaken),
            Err(other) => return Err(other.into()),
        };

        let profile = Profile {
            id: next_profile_id(),
            username: submission.username,
            first_name: submission.first_name,
            middle_name: submission.middle_name,
            last_name: submission.last_name,
            date_of_birth: submission.date_of_birth,
            gender: submission.gender,
            email: submission.email,
            phone: submission.phone,
            country_of_residence: submission.country_of_residence,
            consent: submission.consent,
        };
        let stored = match self.repository.insert_profile(profile) {
            Ok(profile) => profile,
            Err(RepositoryError::Conflict) => return Err(OnboardingError::AlreadyRegistered),
            Err(other) => return Err(other.into()),
        };

        let mut details = BTreeMap::new();
        details.insert("email".to_string(), stored.email.clone());
        self.notifications.notify(Notice {
            template: "registration_received".to_string(),
            username: stored.username.clone(),
            details,
        })?;

        Ok((stored, account.identity()))
    }

    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Identity, OnboardingError> {
        let account = self
            .repository
            .fetch_account(username)?
            .ok_or(OnboardingError::InvalidCredentials)?;

        let valid = bcrypt::verify(password, &account.password_hash)
            .map_err(|err| OnboardingError::Credentials(err.to_string()))?;
        if !valid {
            return Err(OnboardingError::InvalidCredentials);
        }

        Ok(account.identity())
    }

    pub fn change_password(
        &self,
        identity: &Identity,
        current: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<(), OnboardingError> {
        let mut account = self
            .repository
            .fetch_account(&identity.username)?
            .ok_or(OnboardingError::InvalidCredentials)?;

        let valid = bcrypt::verify(current, &account.password_hash)
            .map_err(|err| OnboardingError::Credentials(err.to_string()))?;
        if !valid {
            return Err(OnboardingError::InvalidCredentials);
        }

        self.intake.validate_password(new_password, confirmation)?;
        account.password_hash = bcrypt::hash(new_password, bcrypt::DEFAULT_COST)
            .map_err(|err| OnboardingError::Credentials(err.to_string()))?;
        self.repository.update_account(account)?;

        Ok(())
    }

    /// Seeds an administrative account, used by the composition root at
    /// startup. Idempotent: an existing account is left untouched.
    pub fn seed_admin(&self, username: &str, password: &str) -> Result<(), OnboardingError> {
        if self.repository.fetch_account(username)?.is_some() {
            return Ok(());
        }

        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|err| OnboardingError::Credentials(err.to_string()))?;
        match self.repository.create_account(Account {
            username: username.to_string(),
            password_hash,
            is_admin: true,
        }) {
            Ok(_) | Err(RepositoryError::Conflict) => Ok(()),
            Err(other) => Err(other.into()),
        }
    }

    /// The setup dispatcher: which section to present next, or finished.
    pub fn next_step(&self, profile: &Profile) -> Result<SetupState, OnboardingError> {
        match self.resolver.first_incomplete_section(&profile.id)? {
            None => Ok(SetupState::Finished),
            Some(kind) => {
                let section = self
                    .registry
                    .descriptor(kind)
                    .copied()
                    .ok_or(OnboardingError::NotInSequence(kind))?;
                Ok(SetupState::Pending { section })
            }
        }
    }

    /// First submission of a setup section. Two concurrent submissions may
    /// both observe the section as unset; the repository's uniqueness
    /// constraint picks the winner and the loser is reported as already
    /// complete so the caller can redirect to the next step.
    pub fn submit_section(
        &self,
        profile: &Profile,
        data: SectionData,
    ) -> Result<SectionOutcome, OnboardingError> {
        let kind = data.kind();
        if !self.registry.contains(kind) {
            return Err(OnboardingError::NotInSequence(kind));
        }
        self.intake.validate_section(&data)?;

        match self.repository.insert_section(SectionRecord {
            profile: profile.id.clone(),
            data,
        }) {
            Ok(record) => Ok(SectionOutcome::Created(record)),
            Err(RepositoryError::Conflict) => Ok(SectionOutcome::AlreadyComplete(kind)),
            Err(other) => Err(other.into()),
        }
    }

    /// Mutates an already-completed section.
    pub fn edit_section(
        &self,
        profile: &Profile,
        data: SectionData,
    ) -> Result<SectionRecord, OnboardingError> {
        let kind = data.kind();
        if !self.registry.contains(kind) {
            return Err(OnboardingError::NotInSequence(kind));
        }
        self.intake.validate_section(&data)?;

        let record = SectionRecord {
            profile: profile.id.clone(),
            data,
        };
        match self.repository.update_section(record.clone()) {
            Ok(()) => Ok(record),
            Err(RepositoryError::NotFound) => Err(OnboardingError::SectionNotSet(kind)),
            Err(other) => Err(other.into()),
        }
    }

    pub fn update_profile(
        &self,
        profile: &Profile,
        update: ProfileUpdate,
    ) -> Result<Profile, OnboardingError> {
        let updated = Profile {
            id: profile.id.clone(),
            username: profile.username.clone(),
            first_name: update.first_name,
            middle_name: update.middle_name,
            last_name: update.last_name,
            date_of_birth: profile.date_of_birth,
            gender: update.gender,
            email: update.email,
            phone: update.phone,
            country_of_residence: update.country_of_residence,
            consent: profile.consent,
        };

        if updated.first_name.trim().is_empty() || updated.last_name.trim().is_empty() {
            return Err(IntakeError::MissingField("name").into());
        }
        if !updated.email.contains('@') {
            return Err(IntakeError::InvalidEmail(updated.email.clone()).into());
        }

        self.repository.update_profile(updated.clone())?;
        Ok(updated)
    }

    pub fn overview(&self, profile: &Profile) -> Result<ProfileOverview, OnboardingError> {
        let mut sections = Vec::with_capacity(self.registry.len());
        for descriptor in self.registry.sections() {
            sections.push(SectionStatus {
                kind: descriptor.kind,
                slug: descriptor.kind.slug(),
                title: descriptor.title,
                completed: self.resolver.has_section(&profile.id, descriptor.kind)?,
            });
        }

        let setup_completed = sections.iter().all(|section| section.completed);
        let approval = self.approval_status(&profile.id)?;
        let rsvp_going = match self.repository.find_section(&profile.id, SectionKind::Rsvp)? {
            Some(SectionRecord {
                data: SectionData::Rsvp(answer),
                ..
            }) => Some(answer.going),
            _ => None,
        };

        Ok(ProfileOverview {
            full_name: profile.full_name(),
            profile: profile.clone(),
            sections,
            setup_completed,
            approval,
            rsvp_going,
        })
    }

    pub fn approval_status(&self, profile: &ProfileId) -> Result<ApprovalStatus, OnboardingError> {
        let decision = match self
            .repository
            .find_section(profile, SectionKind::Approval)?
        {
            Some(SectionRecord {
                data: SectionData::Approval(decision),
                ..
            }) => Some(decision),
            _ => None,
        };
        Ok(ApprovalStatus::from_decision(decision.as_ref()))
    }

    /// Administrative decision on an application. Upserts the approval
    /// record and notifies the applicant.
    pub fn set_approval(
        &self,
        username: &str,
        approved: bool,
    ) -> Result<ApprovalStatus, OnboardingError> {
        let profile = self
            .repository
            .fetch_profile(username)?
            .ok_or_else(|| OnboardingError::UnknownProfile(username.to_string()))?;

        let record = SectionRecord {
            profile: profile.id.clone(),
            data: SectionData::Approval(ApprovalDecision { approved }),
        };
        match self.repository.insert_section(record.clone()) {
            Ok(_) => {}
            Err(RepositoryError::Conflict) => self.repository.update_section(record)?,
            Err(other) => return Err(other.into()),
        }

        let status = if approved {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Rejected
        };

        let mut details = BTreeMap::new();
        details.insert("decision".to_string(), status.label().to_string());
        self.notifications.notify(Notice {
            template: "application_decision".to_string(),
            username: profile.username,
            details,
        })?;

        Ok(status)
    }

    /// Administrative reset: deletes a section so the profile drops back to
    /// "pending" for that step. This is the one out-of-band way a profile
    /// moves backwards in the sequence.
    pub fn reset_section(
        &self,
        username: &str,
        kind: SectionKind,
    ) -> Result<(), OnboardingError> {
        let profile = self
            .repository
            .fetch_profile(username)?
            .ok_or_else(|| OnboardingError::UnknownProfile(username.to_string()))?;

        match self.repository.delete_section(&profile.id, kind) {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(OnboardingError::SectionNotSet(kind)),
            Err(other) => Err(other.into()),
        }
    }

    /// Attendance answer, available once setup is complete and an
    /// administrator has approved the application. Answers may be changed.
    pub fn rsvp(&self, profile: &Profile, going: bool) -> Result<SectionOutcome, OnboardingError> {
        if self.approval_status(&profile.id)? != ApprovalStatus::Approved {
            return Err(OnboardingError::NotApproved);
        }

        let record = SectionRecord {
            profile: profile.id.clone(),
            data: SectionData::Rsvp(super::domain::RsvpAnswer { going }),
        };
        match self.repository.insert_section(record.clone()) {
            Ok(stored) => Ok(SectionOutcome::Created(stored)),
            Err(RepositoryError::Conflict) => {
                self.repository.update_section(record.clone())?;
                Ok(SectionOutcome::Updated(record))
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Fetches the stored CV for a download request, if one was uploaded.
    pub fn cv_for(
        &self,
        username: &str,
    ) -> Result<Option<super::domain::CvDocument>, OnboardingError> {
        let profile = self
            .repository
            .fetch_profile(username)?
            .ok_or_else(|| OnboardingError::UnknownProfile(username.to_string()))?;

        match self.repository.find_section(&profile.id, SectionKind::Cv)? {
            Some(SectionRecord {
                data: SectionData::Cv(cv),
                ..
            }) if cv.has_document() => Ok(Some(cv)),
            _ => Ok(None),
        }
    }
}
