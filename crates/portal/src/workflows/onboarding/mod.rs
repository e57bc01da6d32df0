//! Registration and profile-completion workflow.
//!
//! A profile owns at most one record per section; the registry fixes the
//! order in which sections are presented, the resolver answers which one
//! comes next, and the gates keep handlers from running out of sequence.

pub mod domain;
pub mod gate;
pub mod intake;
pub mod registry;
pub mod repository;
pub mod resolver;
pub mod router;
pub mod service;
pub mod sessions;

#[cfg(test)]
mod tests;

pub use domain::{
    Account, AcademicData, ApprovalDecision, ApprovalStatus, ConsentFlags, CvDocument, Degree,
    HackathonApplication, Identity, OrganizationalData, Profile, ProfileId, RsvpAnswer,
    SectionData, SectionKind, ShirtSize,
};
pub use gate::{require_profile, with_setup_completed, with_unset_section, GateError};
pub use intake::{IntakeError, IntakeGuard, IntakePolicy, RegistrationSubmission};
pub use registry::{RegistryError, SectionDescriptor, SectionRegistry};
pub use repository::{
    Notice, NotificationError, NotificationSink, ProfileRepository, RepositoryError, SectionRecord,
};
pub use resolver::CompletionResolver;
pub use router::{portal_router, PortalState};
pub use service::{
    OnboardingError, OnboardingService, ProfileOverview, ProfileUpdate, SectionOutcome,
    SectionStatus, SetupState,
};
pub use sessions::SessionStore;
