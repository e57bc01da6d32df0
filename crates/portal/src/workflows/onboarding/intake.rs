use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{ConsentFlags, CvDocument, SectionData};

/// Everything a prospective attendee sends when creating an account and
/// profile in one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationSubmission {
    pub username: String,
    pub password: String,
    pub password_confirmation: String,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub country_of_residence: String,
    pub consent: ConsentFlags,
}

/// Tunables for registration and section validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakePolicy {
    pub min_age: u8,
    pub min_password_length: usize,
    pub max_cv_bytes: usize,
    pub min_graduation_year: u16,
    pub max_graduation_year: u16,
}

impl Default for IntakePolicy {
    fn default() -> Self {
        Self {
            min_age: 18,
            min_password_length: 8,
            max_cv_bytes: 8 * 1024 * 1024,
            min_graduation_year: 2016,
            max_graduation_year: 2035,
        }
    }
}

/// A single validation failure. Each maps to a field-level message the
/// original forms rendered inline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("the {0} must be accepted to apply")]
    ConsentRequired(&'static str),
    #[error("applicants must be at least {minimum} years of age")]
    UnderMinimumAge { minimum: u8 },
    #[error("please make sure both password fields match")]
    PasswordMismatch,
    #[error("passwords must be at least {minimum} characters long")]
    PasswordTooShort { minimum: usize },
    #[error("usernames may only contain letters, digits, hyphens, and underscores")]
    InvalidUsername,
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("{0} must not be empty")]
    MissingField(&'static str),
    #[error("graduation year {year} is outside the accepted range {min}-{max}")]
    GraduationYearOutOfRange { year: u16, min: u16, max: u16 },
    #[error("file extension not allowed: must be .pdf")]
    UnsupportedCvExtension,
    #[error("the uploaded CV exceeds the {limit} byte limit")]
    CvTooLarge { limit: usize },
}

/// Validates registrations and section submissions against the policy
/// before anything reaches the repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntakeGuard {
    policy: IntakePolicy,
}

impl IntakeGuard {
    pub fn new(policy: IntakePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &IntakePolicy {
        &self.policy
    }

    pub fn validate_registration(
        &self,
        submission: &RegistrationSubmission,
        today: NaiveDate,
    ) -> Result<(), IntakeError> {
        validate_consent(&submission.consent)?;

        if !is_slug(&submission.username) {
            return Err(IntakeError::InvalidUsername);
        }
        if submission.password != submission.password_confirmation {
            return Err(IntakeError::PasswordMismatch);
        }
        if submission.password.chars().count() < self.policy.min_password_length {
            return Err(IntakeError::PasswordTooShort {
                minimum: self.policy.min_password_length,
            });
        }

        require_filled(&submission.first_name, "first name")?;
        require_filled(&submission.last_name, "last name")?;
        require_filled(&submission.gender, "gender")?;
        require_filled(&submission.country_of_residence, "country of residence")?;

        if !is_email(&submission.email) {
            return Err(IntakeError::InvalidEmail(submission.email.clone()));
        }

        let age = age_on(submission.date_of_birth, today);
        if age < i32::from(self.policy.min_age) {
            return Err(IntakeError::UnderMinimumAge {
                minimum: self.policy.min_age,
            });
        }

        Ok(())
    }

    pub fn validate_section(&self, data: &SectionData) -> Result<(), IntakeError> {
        match data {
            SectionData::Academic(academic) => {
                require_filled(&academic.university, "university")?;
                require_filled(&academic.major, "major")?;
                let (min, max) = (
                    self.policy.min_graduation_year,
                    self.policy.max_graduation_year,
                );
                if academic.graduation_year < min || academic.graduation_year > max {
                    return Err(IntakeError::GraduationYearOutOfRange {
                        year: academic.graduation_year,
                        min,
                        max,
                    });
                }
                Ok(())
            }
            SectionData::Application(application) => {
                require_filled(&application.motivation, "motivation")?;
                require_filled(&application.portfolio, "portfolio")?;
                Ok(())
            }
            SectionData::Organizational(_) => Ok(()),
            SectionData::Cv(cv) => self.validate_cv(cv),
            SectionData::Rsvp(_) => Ok(()),
            SectionData::Approval(_) => Ok(()),
        }
    }

    pub fn validate_cv(&self, cv: &CvDocument) -> Result<(), IntakeError> {
        // The CV itself is optional: an empty upload completes the step,
        // it just cannot be downloaded later.
        if cv.filename.is_empty() && cv.data.is_empty() {
            return Ok(());
        }

        if !cv.filename.to_ascii_lowercase().ends_with(".pdf") {
            return Err(IntakeError::UnsupportedCvExtension);
        }
        if cv.data.len() > self.policy.max_cv_bytes {
            return Err(IntakeError::CvTooLarge {
                limit: self.policy.max_cv_bytes,
            });
        }

        Ok(())
    }

    pub fn validate_password(&self, password: &str, confirmation: &str) -> Result<(), IntakeError> {
        if password != confirmation {
            return Err(IntakeError::PasswordMismatch);
        }
        if password.chars().count() < self.policy.min_password_length {
            return Err(IntakeError::PasswordTooShort {
                minimum: self.policy.min_password_length,
            });
        }
        Ok(())
    }
}

fn validate_consent(consent: &ConsentFlags) -> Result<(), IntakeError> {
    if !consent.event_terms {
        return Err(IntakeError::ConsentRequired("terms and conditions"));
    }
    if !consent.code_of_conduct {
        return Err(IntakeError::ConsentRequired("code of conduct"));
    }
    if !consent.contest_terms {
        return Err(IntakeError::ConsentRequired("contest terms"));
    }
    Ok(())
}

fn require_filled(value: &str, field: &'static str) -> Result<(), IntakeError> {
    if value.trim().is_empty() {
        return Err(IntakeError::MissingField(field));
    }
    Ok(())
}

fn is_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Whole years completed on `today`, counting the birthday itself.
fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    use chrono::Datelike;

    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}
