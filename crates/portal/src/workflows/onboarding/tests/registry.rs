use crate::workflows::onboarding::domain::SectionKind;
use crate::workflows::onboarding::registry::{
    RegistryError, SectionDescriptor, SectionRegistry,
};

#[test]
fn standard_registry_orders_sections() {
    let registry = SectionRegistry::standard();
    let kinds: Vec<_> = registry.kinds().collect();
    assert_eq!(
        kinds,
        vec![
            SectionKind::Academic,
            SectionKind::Application,
            SectionKind::Organizational,
            SectionKind::Cv,
        ]
    );
}

#[test]
fn standard_registry_excludes_admin_driven_sections() {
    let registry = SectionRegistry::standard();
    assert!(!registry.contains(SectionKind::Rsvp));
    assert!(!registry.contains(SectionKind::Approval));
}

#[test]
fn registration_order_is_insertion_order() {
    let mut registry = SectionRegistry::new();
    registry
        .register(SectionDescriptor {
            kind: SectionKind::Organizational,
            title: "Organizational Details",
            subtitle: "logistics",
        })
        .expect("first registration");
    registry
        .register(SectionDescriptor {
            kind: SectionKind::Academic,
            title: "Academic Data",
            subtitle: "studies",
        })
        .expect("second registration");

    let kinds: Vec<_> = registry.kinds().collect();
    assert_eq!(kinds, vec![SectionKind::Organizational, SectionKind::Academic]);
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut registry = SectionRegistry::new();
    let descriptor = SectionDescriptor {
        kind: SectionKind::Academic,
        title: "Academic Data",
        subtitle: "studies",
    };
    registry.register(descriptor).expect("first registration");

    let err = registry
        .register(SectionDescriptor {
            kind: SectionKind::Academic,
            title: "Shadowing Entry",
            subtitle: "must not replace the original",
        })
        .expect_err("duplicate must be rejected");
    assert_eq!(err, RegistryError::AlreadyRegistered(SectionKind::Academic));

    // the earlier descriptor survives untouched
    let stored = registry
        .descriptor(SectionKind::Academic)
        .expect("descriptor present");
    assert_eq!(stored.title, "Academic Data");
    assert_eq!(registry.len(), 1);
}

#[test]
fn lookup_by_slug() {
    let registry = SectionRegistry::standard();
    let descriptor = registry.by_slug("organizational").expect("slug resolves");
    assert_eq!(descriptor.kind, SectionKind::Organizational);
    assert!(registry.by_slug("unknown").is_none());
}
