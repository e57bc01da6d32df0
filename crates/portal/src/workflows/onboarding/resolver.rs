use std::sync::Arc;

use super::domain::{ProfileId, SectionKind};
use super::registry::SectionRegistry;
use super::repository::{ProfileRepository, RepositoryError};

/// Answers the two questions the workflow is built around: does this
/// profile have a given section, and which registered section comes next.
///
/// Both answers are pure reads over the registry and the repository: for a
/// fixed registry and fixed stored sections, every call returns the same
/// result.
pub struct CompletionResolver<R> {
    registry: Arc<SectionRegistry>,
    repository: Arc<R>,
}

impl<R> CompletionResolver<R>
where
    R: ProfileRepository,
{
    pub fn new(registry: Arc<SectionRegistry>, repository: Arc<R>) -> Self {
        Self {
            registry,
            repository,
        }
    }

    pub fn registry(&self) -> &SectionRegistry {
        &self.registry
    }

    /// Existence test only. A stored record with all-blank optional fields
    /// still counts as completed; a missing record maps to `false`, never
    /// to an error.
    pub fn has_section(
        &self,
        profile: &ProfileId,
        kind: SectionKind,
    ) -> Result<bool, RepositoryError> {
        Ok(self.repository.find_section(profile, kind)?.is_some())
    }

    /// First registered section the profile has not completed, in
    /// registration order; `None` once the whole sequence is done.
    pub fn first_incomplete_section(
        &self,
        profile: &ProfileId,
    ) -> Result<Option<SectionKind>, RepositoryError> {
        for kind in self.registry.kinds() {
            if !self.has_section(profile, kind)? {
                return Ok(Some(kind));
            }
        }

        Ok(None)
    }

    pub fn is_setup_completed(&self, profile: &ProfileId) -> Result<bool, RepositoryError> {
        Ok(self.first_incomplete_section(profile)?.is_none())
    }
}
