//! The structured profile record extracted for a completed target.
//!
//! A [`ProfileRecord`] is owned exclusively by its target row in the work
//! store. It is created only by the extractor and consumed by validation
//! and export. Every field is optional or defaultable: a sparse profile is
//! valid data, not an extraction failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One position in the work history, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    /// Job title
    pub title: String,
    /// Company or organization
    pub company: Option<String>,
    /// Date range as shown on the page (e.g. "2019 - Present")
    pub date_range: Option<String>,
    /// Free-text description
    pub description: Option<String>,
}

/// One education entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationEntry {
    /// School or institution name
    pub school: String,
    /// Degree or field of study
    pub degree: Option<String>,
    /// Date range as shown on the page
    pub date_range: Option<String>,
}

/// A skill with its endorsement count when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    /// Skill name
    pub name: String,
    /// Endorsement count, when the page shows one
    pub endorsements: Option<u32>,
}

/// A license or certification entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certification {
    /// Certification name
    pub name: String,
    /// Issuing organization
    pub issuer: Option<String>,
    /// Issue date as shown on the page
    pub issued: Option<String>,
}

/// The structured payload extracted for a scraped profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Full display name
    pub name: Option<String>,
    /// Headline / current role summary
    pub headline: Option<String>,
    /// Location string
    pub location: Option<String>,
    /// About / summary section text
    pub summary: Option<String>,
    /// Work history, in page order
    pub experience: Vec<ExperienceEntry>,
    /// Education entries
    pub education: Vec<EducationEntry>,
    /// Skills, deduplicated by name
    pub skills: Vec<Skill>,
    /// Licenses and certifications
    pub certifications: Vec<Certification>,
    /// Spoken languages
    pub languages: Vec<String>,
    /// External links found on the profile
    pub links: Vec<String>,
    /// When extraction ran
    pub extracted_at: Option<DateTime<Utc>>,
}

impl ProfileRecord {
    /// Whether the record carries a plausible identity.
    ///
    /// Used by validation to distinguish extraction failures from sparse
    /// real profiles: a name that is empty, all digits, or absurdly long
    /// indicates the extractor grabbed the wrong text block.
    #[must_use]
    pub fn has_plausible_name(&self) -> bool {
        let Some(name) = self.name.as_deref() else {
            return false;
        };
        let name = name.trim();

        if name.len() < 2 || name.len() > 200 {
            return false;
        }
        if !name.chars().any(char::is_alphabetic) {
            return false;
        }
        let digits = name.chars().filter(char::is_ascii_digit).count();
        // More than ~30% digits is not a human name
        digits * 10 <= name.chars().count() * 3
    }
}
