//! Administrative roster: the list/filter/export views over all profiles.

mod export;
pub mod router;

pub use export::export_csv;
pub use router::roster_router;

use serde::{Deserialize, Serialize};

use crate::workflows::onboarding::{
    ApprovalStatus, CompletionResolver, CvDocument, Profile, ProfileRepository, RepositoryError,
    SectionData, SectionKind, SectionRecord,
};

/// One flattened row of the administrative list: the profile's scalar
/// fields plus a summary of every linked section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterRow {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub country_of_residence: String,
    pub approval: &'static str,
    pub setup_completed: bool,
    pub first_incomplete: Option<&'static str>,
    pub university: Option<String>,
    pub degree: Option<&'static str>,
    pub major: Option<String>,
    pub graduation_year: Option<u16>,
    pub first_hackathon: Option<bool>,
    pub shirt_size: Option<&'static str>,
    pub need_visa: Option<bool>,
    pub need_reimbursement: Option<bool>,
    pub dietary_requirements: Option<String>,
    pub has_cv: bool,
    pub rsvp_going: Option<bool>,
}

/// Filters an administrator can combine, mirroring the original list
/// filters (approval status, setup completion) and the search box.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RosterFilter {
    #[serde(default)]
    pub approval: Option<ApprovalStatus>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub search: Option<String>,
}

impl RosterFilter {
    pub fn matches(&self, row: &RosterRow) -> bool {
        if let Some(approval) = self.approval {
            if row.approval != approval.label() {
                return false;
            }
        }
        if let Some(completed) = self.completed {
            if row.setup_completed != completed {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref() {
            let needle = search.to_lowercase();
            let haystack = [
                row.username.as_str(),
                row.full_name.as_str(),
                row.email.as_str(),
            ];
            if !haystack
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
            {
                return false;
            }
        }
        true
    }
}

/// Builds one roster row per profile, ordered by username so repeated
/// exports line up.
pub fn build_roster<R>(
    repository: &R,
    resolver: &CompletionResolver<R>,
) -> Result<Vec<RosterRow>, RepositoryError>
where
    R: ProfileRepository,
{
    let mut profiles = repository.list_profiles()?;
    profiles.sort_by(|a, b| a.username.cmp(&b.username));

    let mut rows = Vec::with_capacity(profiles.len());
    for profile in profiles {
        rows.push(build_row(repository, resolver, &profile)?);
    }

    Ok(rows)
}

fn build_row<R>(
    repository: &R,
    resolver: &CompletionResolver<R>,
    profile: &Profile,
) -> Result<RosterRow, RepositoryError>
where
    R: ProfileRepository,
{
    let first_incomplete = resolver.first_incomplete_section(&profile.id)?;

    let academic = match repository.find_section(&profile.id, SectionKind::Academic)? {
        Some(SectionRecord {
            data: SectionData::Academic(academic),
            ..
        }) => Some(academic),
        _ => None,
    };
    let application = match repository.find_section(&profile.id, SectionKind::Application)? {
        Some(SectionRecord {
            data: SectionData::Application(application),
            ..
        }) => Some(application),
        _ => None,
    };
    let organizational = match repository.find_section(&profile.id, SectionKind::Organizational)? {
        Some(SectionRecord {
            data: SectionData::Organizational(organizational),
            ..
        }) => Some(organizational),
        _ => None,
    };
    let cv = match repository.find_section(&profile.id, SectionKind::Cv)? {
        Some(SectionRecord {
            data: SectionData::Cv(cv),
            ..
        }) => Some(cv),
        _ => None,
    };
    let rsvp = match repository.find_section(&profile.id, SectionKind::Rsvp)? {
        Some(SectionRecord {
            data: SectionData::Rsvp(answer),
            ..
        }) => Some(answer),
        _ => None,
    };
    let approval = match repository.find_section(&profile.id, SectionKind::Approval)? {
        Some(SectionRecord {
            data: SectionData::Approval(decision),
            ..
        }) => Some(decision),
        _ => None,
    };

    Ok(RosterRow {
        username: profile.username.clone(),
        full_name: profile.full_name(),
        email: profile.email.clone(),
        country_of_residence: profile.country_of_residence.clone(),
        approval: ApprovalStatus::from_decision(approval.as_ref()).label(),
        setup_completed: first_incomplete.is_none(),
        first_incomplete: first_incomplete.map(SectionKind::slug),
        university: academic.as_ref().map(|a| a.university.clone()),
        degree: academic.as_ref().map(|a| a.degree.label()),
        major: academic.as_ref().map(|a| a.major.clone()),
        graduation_year: academic.as_ref().map(|a| a.graduation_year),
        first_hackathon: application.as_ref().map(|a| a.first_hackathon),
        shirt_size: organizational.as_ref().map(|o| o.shirt_size.label()),
        need_visa: organizational.as_ref().map(|o| o.need_visa),
        need_reimbursement: organizational.as_ref().map(|o| o.need_reimbursement),
        dietary_requirements: organizational.as_ref().map(|o| o.dietary_requirements.clone()),
        has_cv: cv.as_ref().is_some_and(CvDocument::has_document),
        rsvp_going: rsvp.map(|answer| answer.going),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(username: &str, approval: &'static str, completed: bool) -> RosterRow {
        RosterRow {
            username: username.to_string(),
            full_name: "Huber Ackerman".to_string(),
            email: format!("{username}@example.org"),
            country_of_residence: "Germany".to_string(),
            approval,
            setup_completed: completed,
            first_incomplete: (!completed).then_some("academic"),
            university: None,
            degree: None,
            major: None,
            graduation_year: None,
            first_hackathon: None,
            shirt_size: None,
            need_visa: None,
            need_reimbursement: None,
            dietary_requirements: None,
            has_cv: false,
            rsvp_going: None,
        }
    }

    #[test]
    fn filter_combines_approval_completion_and_search() {
        let complete = row("alice", "approved", true);
        let incomplete = row("bob", "pending", false);

        let by_completion = RosterFilter {
            completed: Some(true),
            ..RosterFilter::default()
        };
        assert!(by_completion.matches(&complete));
        assert!(!by_completion.matches(&incomplete));

        let by_approval = RosterFilter {
            approval: Some(ApprovalStatus::Pending),
            ..RosterFilter::default()
        };
        assert!(by_approval.matches(&incomplete));
        assert!(!by_approval.matches(&complete));

        let by_search = RosterFilter {
            search: Some("ALICE".to_string()),
            ..RosterFilter::default()
        };
        assert!(by_search.matches(&complete));
        assert!(!by_search.matches(&incomplete));

        let combined = RosterFilter {
            approval: Some(ApprovalStatus::Approved),
            completed: Some(false),
            search: None,
        };
        assert!(!combined.matches(&complete));
        assert!(!combined.matches(&incomplete));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = RosterFilter::default();
        assert!(filter.matches(&row("anyone", "pending", false)));
    }

    #[test]
    fn csv_export_writes_header_and_rows() {
        let rows = vec![row("alice", "approved", true)];
        let bytes = export_csv(&rows).expect("export succeeds");
        let text = String::from_utf8(bytes).expect("utf-8 output");

        let mut lines = text.lines();
        let header = lines.next().expect("header line");
        assert!(header.starts_with("username,full_name,email"));
        let first = lines.next().expect("data line");
        assert!(first.starts_with("alice,Huber Ackerman,alice@example.org"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn csv_export_keeps_header_for_empty_roster() {
        let bytes = export_csv(&[]).expect("export succeeds");
        let text = String::from_utf8(bytes).expect("utf-8 output");
        assert_eq!(text.lines().count(), 1);
    }
}
