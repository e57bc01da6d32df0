use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for registered profiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileId(pub String);

/// Authenticated caller as resolved from a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub is_admin: bool,
}

/// Login credentials stored alongside the profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
}

impl Account {
    pub fn identity(&self) -> Identity {
        Identity {
            username: self.username.clone(),
            is_admin: self.is_admin,
        }
    }
}

/// Consent checkboxes collected at registration. The first three are
/// mandatory; sharing consent is the only optional one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentFlags {
    pub event_terms: bool,
    pub code_of_conduct: bool,
    pub contest_terms: bool,
    #[serde(default)]
    pub sharing_consent: bool,
}

/// The primary per-user record the completion workflow tracks. Exactly one
/// profile exists per authentication identity (keyed by username).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub username: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub email: String,
    pub phone: Option<String>,
    pub country_of_residence: String,
    pub consent: ConsentFlags,
}

impl Profile {
    pub fn full_name(&self) -> String {
        let mut names = vec![self.first_name.as_str()];
        if let Some(middle) = self.middle_name.as_deref() {
            names.push(middle);
        }
        names.push(self.last_name.as_str());
        names.join(" ")
    }
}

/// Every section record a profile can own. `Rsvp` and `Approval` exist as
/// kinds but are never part of the user-driven setup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Academic,
    Application,
    Organizational,
    Cv,
    Rsvp,
    Approval,
}

impl SectionKind {
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Academic => "academic",
            Self::Application => "application",
            Self::Organizational => "organizational",
            Self::Cv => "cv",
            Self::Rsvp => "rsvp",
            Self::Approval => "approval",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Academic => "Academic Data",
            Self::Application => "Application",
            Self::Organizational => "Organizational Details",
            Self::Cv => "CV",
            Self::Rsvp => "RSVP",
            Self::Approval => "Approval",
        }
    }

    pub fn from_slug(value: &str) -> Option<Self> {
        match value {
            "academic" => Some(Self::Academic),
            "application" => Some(Self::Application),
            "organizational" => Some(Self::Organizational),
            "cv" => Some(Self::Cv),
            "rsvp" => Some(Self::Rsvp),
            "approval" => Some(Self::Approval),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Degree {
    BachelorOfScience,
    BachelorOfArts,
    MasterOfScience,
    MasterOfArts,
    Phd,
    Mba,
}

impl Degree {
    pub const fn label(self) -> &'static str {
        match self {
            Self::BachelorOfScience => "Bachelor of Science",
            Self::BachelorOfArts => "Bachelor of Arts",
            Self::MasterOfScience => "Master of Science",
            Self::MasterOfArts => "Master of Arts",
            Self::Phd => "PhD",
            Self::Mba => "MBA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShirtSize {
    Xs,
    S,
    M,
    L,
    Xl,
}

impl ShirtSize {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Xs => "Extra Small (XS)",
            Self::S => "Small (S)",
            Self::M => "Medium (M)",
            Self::L => "Large (L)",
            Self::Xl => "Extra Large (XL)",
        }
    }
}

/// Academic background collected during setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicData {
    pub university: String,
    pub degree: Degree,
    pub major: String,
    pub graduation_year: u16,
}

/// The free-text application answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HackathonApplication {
    pub motivation: String,
    pub portfolio: String,
    #[serde(default)]
    pub first_hackathon: bool,
}

/// Logistics answers collected during setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationalData {
    pub shirt_size: ShirtSize,
    #[serde(default)]
    pub need_visa: bool,
    #[serde(default)]
    pub need_reimbursement: bool,
    #[serde(default)]
    pub dietary_requirements: String,
    #[serde(default)]
    pub comments: String,
}

/// Uploaded CV. The document itself travels with the record; an empty
/// `data` still counts as a completed section (existence is what the
/// resolver checks), it just cannot be downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvDocument {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl CvDocument {
    pub fn has_document(&self) -> bool {
        !self.data.is_empty()
    }

    /// Download name exposed for the document, normalized per profile.
    pub fn download_name(&self, username: &str) -> String {
        format!("{username}.pdf")
    }
}

/// Attendance answer collected once an application has been approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpAnswer {
    pub going: bool,
}

/// Administrative decision on an application. Absence of the record means
/// the decision is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub approved: bool,
}

/// Three-valued view over the stored approval record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_decision(decision: Option<&ApprovalDecision>) -> Self {
        match decision {
            None => Self::Pending,
            Some(ApprovalDecision { approved: true }) => Self::Approved,
            Some(ApprovalDecision { approved: false }) => Self::Rejected,
        }
    }
}

/// One section payload, tagged by kind. Each variant is stored 1:1 against
/// a profile; the record is created on first submission and mutated on
/// later ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionData {
    Academic(AcademicData),
    Application(HackathonApplication),
    Organizational(OrganizationalData),
    Cv(CvDocument),
    Rsvp(RsvpAnswer),
    Approval(ApprovalDecision),
}

impl SectionData {
    pub const fn kind(&self) -> SectionKind {
        match self {
            Self::Academic(_) => SectionKind::Academic,
            Self::Application(_) => SectionKind::Application,
            Self::Organizational(_) => SectionKind::Organizational,
            Self::Cv(_) => SectionKind::Cv,
            Self::Rsvp(_) => SectionKind::Rsvp,
            Self::Approval(_) => SectionKind::Approval,
        }
    }
}
