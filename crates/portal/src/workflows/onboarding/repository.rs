use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{Account, Profile, ProfileId, SectionData, SectionKind};

/// One stored section, linked 1:1 to its owning profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub profile: ProfileId,
    pub data: SectionData,
}

impl SectionRecord {
    pub fn kind(&self) -> SectionKind {
        self.data.kind()
    }
}

/// Storage abstraction for accounts, profiles, and their linked sections.
///
/// Section absence is an ordinary `Ok(None)`, never an error: "not found"
/// means "not yet completed". The only duplicate safeguard for concurrent
/// first submissions is `insert_section` returning [`RepositoryError::Conflict`]
/// for an existing profile+kind pair; callers recover from that instead of
/// assuming it cannot happen.
pub trait ProfileRepository: Send + Sync {
    fn create_account(&self, account: Account) -> Result<Account, RepositoryError>;
    fn fetch_account(&self, username: &str) -> Result<Option<Account>, RepositoryError>;
    fn update_account(&self, account: Account) -> Result<(), RepositoryError>;

    fn insert_profile(&self, profile: Profile) -> Result<Profile, RepositoryError>;
    fn fetch_profile(&self, username: &str) -> Result<Option<Profile>, RepositoryError>;
    fn update_profile(&self, profile: Profile) -> Result<(), RepositoryError>;
    fn list_profiles(&self) -> Result<Vec<Profile>, RepositoryError>;

    fn find_section(
        &self,
        profile: &ProfileId,
        kind: SectionKind,
    ) -> Result<Option<SectionRecord>, RepositoryError>;
    fn insert_section(&self, record: SectionRecord) -> Result<SectionRecord, RepositoryError>;
    fn update_section(&self, record: SectionRecord) -> Result<(), RepositoryError>;
    fn delete_section(&self, profile: &ProfileId, kind: SectionKind)
        -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (e-mail adapters and the like) so the
/// service can announce registrations and decisions without knowing the
/// transport.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: Notice) -> Result<(), NotificationError>;
}

/// Simple notice payload so routes/tests can assert integration boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub template: String,
    pub username: String,
    pub details: BTreeMap<String, String>,
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
