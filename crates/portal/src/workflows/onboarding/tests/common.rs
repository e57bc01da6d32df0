use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::workflows::onboarding::domain::{
    AcademicData, Account, ConsentFlags, CvDocument, Degree, HackathonApplication, Identity,
    OrganizationalData, Profile, ProfileId, SectionData, SectionKind, ShirtSize,
};
use crate::workflows::onboarding::intake::{IntakePolicy, RegistrationSubmission};
use crate::workflows::onboarding::registry::SectionRegistry;
use crate::workflows::onboarding::repository::{
    Notice, NotificationError, NotificationSink, ProfileRepository, RepositoryError, SectionRecord,
};
use crate::workflows::onboarding::router::{portal_router, PortalState};
use crate::workflows::onboarding::service::OnboardingService;
use crate::workflows::onboarding::sessions::SessionStore;

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
}

pub(super) fn submission(username: &str) -> RegistrationSubmission {
    RegistrationSubmission {
        username: username.to_string(),
        password: "correct-horse-battery".to_string(),
        password_confirmation: "correct-horse-battery".to_string(),
        first_name: "Huber".to_string(),
        middle_name: None,
        last_name: "Ackerman".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(2000, 1, 15).expect("valid date"),
        gender: "Prefer Not to Answer".to_string(),
        email: format!("{username}@example.org"),
        phone: Some("+49 421 200 40".to_string()),
        country_of_residence: "Germany".to_string(),
        consent: ConsentFlags {
            event_terms: true,
            code_of_conduct: true,
            contest_terms: true,
            sharing_consent: false,
        },
    }
}

pub(super) fn academic() -> SectionData {
    SectionData::Academic(AcademicData {
        university: "Constructor University".to_string(),
        degree: Degree::BachelorOfScience,
        major: "Computer Science".to_string(),
        graduation_year: 2027,
    })
}

pub(super) fn application() -> SectionData {
    SectionData::Application(HackathonApplication {
        motivation: "I want to build something useful with new people.".to_string(),
        portfolio: "https://github.com/hackerman".to_string(),
        first_hackathon: true,
    })
}

pub(super) fn organizational() -> SectionData {
    SectionData::Organizational(OrganizationalData {
        shirt_size: ShirtSize::M,
        need_visa: false,
        need_reimbursement: true,
        dietary_requirements: "Vegetarian".to_string(),
        comments: String::new(),
    })
}

pub(super) fn cv_document() -> SectionData {
    SectionData::Cv(CvDocument {
        filename: "cv.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        data: b"%PDF-1.4 sample".to_vec(),
    })
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    accounts: Mutex<HashMap<String, Account>>,
    profiles: Mutex<HashMap<String, Profile>>,
    sections: Mutex<HashMap<(ProfileId, SectionKind), SectionRecord>>,
}

impl ProfileRepository for MemoryRepository {
    fn create_account(&self, account: Account) -> Result<Account, RepositoryError> {
        let mut guard = self.accounts.lock().expect("account mutex poisoned");
        if guard.contains_key(&account.username) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(account.username.clone(), account.clone());
        Ok(account)
    }

    fn fetch_account(&self, username: &str) -> Result<Option<Account>, RepositoryError> {
        let guard = self.accounts.lock().expect("account mutex poisoned");
        Ok(guard.get(username).cloned())
    }

    fn update_account(&self, account: Account) -> Result<(), RepositoryError> {
        let mut guard = self.accounts.lock().expect("account mutex poisoned");
        if !guard.contains_key(&account.username) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(account.username.clone(), account);
        Ok(())
    }

    fn insert_profile(&self, profile: Profile) -> Result<Profile, RepositoryError> {
        let mut guard = self.profiles.lock().expect("profile mutex poisoned");
        let duplicate = guard.contains_key(&profile.username)
            || guard.values().any(|existing| existing.email == profile.email);
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(profile.username.clone(), profile.clone());
        Ok(profile)
    }

    fn fetch_profile(&self, username: &str) -> Result<Option<Profile>, RepositoryError> {
        let guard = self.profiles.lock().expect("profile mutex poisoned");
        Ok(guard.get(username).cloned())
    }

    fn update_profile(&self, profile: Profile) -> Result<(), RepositoryError> {
        let mut guard = self.profiles.lock().expect("profile mutex poisoned");
        if !guard.contains_key(&profile.username) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(profile.username.clone(), profile);
        Ok(())
    }

    fn list_profiles(&self) -> Result<Vec<Profile>, RepositoryError> {
        let guard = self.profiles.lock().expect("profile mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn find_section(
        &self,
        profile: &ProfileId,
        kind: SectionKind,
    ) -> Result<Option<SectionRecord>, RepositoryError> {
        let guard = self.sections.lock().expect("section mutex poisoned");
        Ok(guard.get(&(profile.clone(), kind)).cloned())
    }

    fn insert_section(&self, record: SectionRecord) -> Result<SectionRecord, RepositoryError> {
        let mut guard = self.sections.lock().expect("section mutex poisoned");
        let key = (record.profile.clone(), record.kind());
        if guard.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(key, record.clone());
        Ok(record)
    }

    fn update_section(&self, record: SectionRecord) -> Result<(), RepositoryError> {
        let mut guard = self.sections.lock().expect("section mutex poisoned");
        let key = (record.profile.clone(), record.kind());
        if !guard.contains_key(&key) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(key, record);
        Ok(())
    }

    fn delete_section(
        &self,
        profile: &ProfileId,
        kind: SectionKind,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.sections.lock().expect("section mutex poisoned");
        match guard.remove(&(profile.clone(), kind)) {
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound),
        }
    }
}

/// Simulates the losing side of a concurrent first submission: reads keep
/// reporting the section as absent while the underlying store already has
/// the winner's record.
pub(super) struct StaleReadRepository {
    pub(super) inner: Arc<MemoryRepository>,
    pub(super) stale_kind: SectionKind,
}

impl ProfileRepository for StaleReadRepository {
    fn create_account(&self, account: Account) -> Result<Account, RepositoryError> {
        self.inner.create_account(account)
    }

    fn fetch_account(&self, username: &str) -> Result<Option<Account>, RepositoryError> {
        self.inner.fetch_account(username)
    }

    fn update_account(&self, account: Account) -> Result<(), RepositoryError> {
        self.inner.update_account(account)
    }

    fn insert_profile(&self, profile: Profile) -> Result<Profile, RepositoryError> {
        self.inner.insert_profile(profile)
    }

    fn fetch_profile(&self, username: &str) -> Result<Option<Profile>, RepositoryError> {
        self.inner.fetch_profile(username)
    }

    fn update_profile(&self, profile: Profile) -> Result<(), RepositoryError> {
        self.inner.update_profile(profile)
    }

    fn list_profiles(&self) -> Result<Vec<Profile>, RepositoryError> {
        self.inner.list_profiles()
    }

    fn find_section(
        &self,
        profile: &ProfileId,
        kind: SectionKind,
    ) -> Result<Option<SectionRecord>, RepositoryError> {
        if kind == self.stale_kind {
            return Ok(None);
        }
        self.inner.find_section(profile, kind)
    }

    fn insert_section(&self, record: SectionRecord) -> Result<SectionRecord, RepositoryError> {
        self.inner.insert_section(record)
    }

    fn update_section(&self, record: SectionRecord) -> Result<(), RepositoryError> {
        self.inner.update_section(record)
    }

    fn delete_section(
        &self,
        profile: &ProfileId,
        kind: SectionKind,
    ) -> Result<(), RepositoryError> {
        self.inner.delete_section(profile, kind)
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifications {
    events: Mutex<Vec<Notice>>,
}

impl MemoryNotifications {
    pub(super) fn events(&self) -> Vec<Notice> {
        self.events.lock().expect("notice mutex poisoned").clone()
    }
}

impl NotificationSink for MemoryNotifications {
    fn notify(&self, notice: Notice) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notice mutex poisoned")
            .push(notice);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemorySessions {
    counter: AtomicU64,
    tokens: Mutex<HashMap<String, Identity>>,
}

impl SessionStore for MemorySessions {
    fn issue(&self, identity: Identity) -> String {
        let token = format!("token-{}", self.counter.fetch_add(1, Ordering::Relaxed));
        self.tokens
            .lock()
            .expect("session mutex poisoned")
            .insert(token.clone(), identity);
        token
    }

    fn resolve(&self, token: &str) -> Option<Identity> {
        self.tokens
            .lock()
            .expect("session mutex poisoned")
            .get(token)
            .cloned()
    }

    fn revoke(&self, token: &str) {
        self.tokens
            .lock()
            .expect("session mutex poisoned")
            .remove(token);
    }
}

pub(super) fn build_service() -> (
    Arc<OnboardingService<MemoryRepository, MemoryNotifications>>,
    Arc<MemoryRepository>,
    Arc<MemoryNotifications>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = Arc::new(OnboardingService::new(
        SectionRegistry::standard(),
        repository.clone(),
        notifications.clone(),
        IntakePolicy::default(),
    ));
    (service, repository, notifications)
}

pub(super) fn register_profile(
    service: &OnboardingService<MemoryRepository, MemoryNotifications>,
    username: &str,
) -> Profile {
    let (profile, _) = service
        .register(submission(username), today())
        .expect("registration succeeds");
    profile
}

pub(super) fn build_state() -> (
    PortalState<MemoryRepository, MemoryNotifications, MemorySessions>,
    Arc<MemorySessions>,
) {
    let (service, _, _) = build_service();
    let sessions = Arc::new(MemorySessions::default());
    (
        PortalState {
            service,
            sessions: sessions.clone(),
        },
        sessions,
    )
}

pub(super) fn build_router() -> (
    axum::Router,
    PortalState<MemoryRepository, MemoryNotifications, MemorySessions>,
) {
    let (state, _) = build_state();
    (portal_router(state.clone()), state)
}
