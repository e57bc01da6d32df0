use super::domain::SectionKind;
use serde::Serialize;

/// Metadata for one setup step: the section it fulfills plus the prompt
/// copy shown when the step is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionDescriptor {
    pub kind: SectionKind,
    pub title: &'static str,
    pub subtitle: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("section '{}' is already registered", .0.slug())]
    AlreadyRegistered(SectionKind),
}

/// The canonical, ordered list of sections a profile must complete.
///
/// Backed by a `Vec` on purpose: registration order is the completion
/// sequence, and a hash container would make "next step" nondeterministic.
/// Populated once at startup through [`SectionRegistry::standard`] or
/// explicit [`SectionRegistry::register`] calls.
#[derive(Debug, Default)]
pub struct SectionRegistry {
    sections: Vec<SectionDescriptor>,
}

impl SectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock setup sequence: academic data, application answers,
    /// organizational details, CV. RSVP and approval deliberately stay
    /// outside the wizard.
    pub fn standard() -> Self {
        Self {
            sections: vec![
                SectionDescriptor {
                    kind: SectionKind::Academic,
                    title: "Academic Data",
                    subtitle: "tell us where you study and what you are working towards",
                },
                SectionDescriptor {
                    kind: SectionKind::Application,
                    title: "Application",
                    subtitle: "tell us your reasons for applying",
                },
                SectionDescriptor {
                    kind: SectionKind::Organizational,
                    title: "Organizational Details",
                    subtitle: "some more organizational details we need to work out",
                },
                SectionDescriptor {
                    kind: SectionKind::Cv,
                    title: "CV",
                    subtitle: "upload your CV",
                },
            ],
        }
    }

    /// Appends a descriptor to the sequence. Registering the same section
    /// twice is a programming error and is rejected rather than silently
    /// shadowing the earlier entry.
    pub fn register(&mut self, descriptor: SectionDescriptor) -> Result<(), RegistryError> {
        if self.contains(descriptor.kind) {
            return Err(RegistryError::AlreadyRegistered(descriptor.kind));
        }
        self.sections.push(descriptor);
        Ok(())
    }

    pub fn contains(&self, kind: SectionKind) -> bool {
        self.sections.iter().any(|entry| entry.kind == kind)
    }

    /// Descriptors in registration order.
    pub fn sections(&self) -> &[SectionDescriptor] {
        &self.sections
    }

    /// Section kinds in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = SectionKind> + '_ {
        self.sections.iter().map(|entry| entry.kind)
    }

    pub fn descriptor(&self, kind: SectionKind) -> Option<&SectionDescriptor> {
        self.sections.iter().find(|entry| entry.kind == kind)
    }

    pub fn by_slug(&self, slug: &str) -> Option<&SectionDescriptor> {
        self.sections.iter().find(|entry| entry.kind.slug() == slug)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
