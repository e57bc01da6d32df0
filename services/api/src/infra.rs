use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

use portal::workflows::onboarding::{
    Account, Identity, Notice, NotificationError, NotificationSink, Profile, ProfileId,
    ProfileRepository, RepositoryError, SectionKind, SectionRecord, SessionStore,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
pub(crate) struct InMemoryProfileRepository {
    accounts: Mutex<HashMap<String, Account>>,
    profiles: Mutex<HashMap<String, Profile>>,
    sections: Mutex<HashMap<(ProfileId, SectionKind), SectionRecord>>,
}

impl ProfileRepository for InMemoryProfileRepository {
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

#[derive(Default)]
pub(crate) struct InMemorySessionStore {
    tokens: Mutex<HashMap<String, Identity>>,
}

impl SessionStore for InMemorySessionStore {
    fn issue(&self, identity: Identity) -> String {
        let token = nanoid::nanoid!(32);
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

/// Logs notices instead of delivering mail; a deployment swaps in an SMTP
/// adapter behind the same trait.
#[derive(Default)]
pub(crate) struct LoggingNotificationSink {
    events: Mutex<Vec<Notice>>,
}

impl LoggingNotificationSink {
    pub(crate) fn events(&self) -> Vec<Notice> {
        self.events.lock().expect("notice mutex poisoned").clone()
    }
}

impl NotificationSink for LoggingNotificationSink {
    fn notify(&self, notice: Notice) -> Result<(), NotificationError> {
        info!(template = %notice.template, username = %notice.username, "notice queued");
        self.events
            .lock()
            .expect("notice mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
