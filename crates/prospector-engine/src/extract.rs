//! Landmark-based profile extraction.
//!
//! The extractor is a pure function over the visible text of a rendered
//! profile page. Sections are located by their headings ("About",
//! "Experience", ...) rather than by markup position, so a layout change
//! degrades to a missing field instead of a parse failure. A missing
//! section is valid data; the only error this module produces is an
//! unreadable surface.

use crate::error::{EngineError, Result};
use chrono::Utc;
use prospector_core::record::{Certification, EducationEntry, ExperienceEntry, ProfileRecord, Skill};
use regex::Regex;
use std::sync::OnceLock;

const ABOUT_HEADINGS: &[&str] = &["about", "summary"];
const EXPERIENCE_HEADINGS: &[&str] = &["experience", "work experience", "professional experience"];
const EDUCATION_HEADINGS: &[&str] = &["education", "academic background"];
const SKILLS_HEADINGS: &[&str] = &["skills", "core skills", "competencies"];
const CERTIFICATION_HEADINGS: &[&str] = &["licenses & certifications", "licenses", "certifications"];
const LANGUAGE_HEADINGS: &[&str] = &["languages"];

/// Headings that terminate whichever section is being collected.
const ALL_HEADINGS: &[&str] = &[
    "about",
    "summary",
    "experience",
    "work experience",
    "professional experience",
    "education",
    "academic background",
    "skills",
    "core skills",
    "competencies",
    "licenses & certifications",
    "licenses",
    "certifications",
    "languages",
    "projects",
    "recommendations",
    "interests",
    "activity",
];

/// Chrome around the content that should never be mistaken for data.
const NOISE_MARKERS: &[&str] = &["http", "follow", "message", "endorse", "button", "connect"];

fn endorsement_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*endorsements?").expect("valid regex"))
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s<>)]+").expect("valid regex"))
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(19|20)\d{2}\b").expect("valid regex"))
}

/// Field weights for the completeness score. The defaults sum to 100.
#[derive(Debug, Clone)]
pub struct CompletenessWeights {
    pub name: u32,
    pub headline: u32,
    pub location: u32,
    pub summary: u32,
    pub experience: u32,
    pub education: u32,
    pub skills: u32,
    pub certifications: u32,
}

impl Default for CompletenessWeights {
    fn default() -> Self {
        Self {
            name: 20,
            headline: 10,
            location: 10,
            summary: 10,
            experience: 20,
            education: 10,
            skills: 15,
            certifications: 5,
        }
    }
}

impl CompletenessWeights {
    fn total(&self) -> u32 {
        self.name
            + self.headline
            + self.location
            + self.summary
            + self.experience
            + self.education
            + self.skills
            + self.certifications
    }
}

/// Score a record 0-100 against the weight table.
///
/// Scalar fields earn their full weight when populated; list fields earn
/// partial credit proportional to populated entries, capped (three
/// experience entries, two education entries, five skills, one
/// certification count as complete).
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn completeness(record: &ProfileRecord, weights: &CompletenessWeights) -> u8 {
    fn list_credit(count: usize, cap: usize, weight: u32) -> f64 {
        let filled = count.min(cap) as f64;
        f64::from(weight) * filled / cap as f64
    }

    let mut earned = 0.0;
    if record.name.as_deref().is_some_and(|s| !s.trim().is_empty()) {
        earned += f64::from(weights.name);
    }
    if record.headline.as_deref().is_some_and(|s| !s.trim().is_empty()) {
        earned += f64::from(weights.headline);
    }
    if record.location.as_deref().is_some_and(|s| !s.trim().is_empty()) {
        earned += f64::from(weights.location);
    }
    if record.summary.as_deref().is_some_and(|s| !s.trim().is_empty()) {
        earned += f64::from(weights.summary);
    }
    earned += list_credit(record.experience.len(), 3, weights.experience);
    earned += list_credit(record.education.len(), 2, weights.education);
    earned += list_credit(record.skills.len(), 5, weights.skills);
    earned += list_credit(record.certifications.len(), 1, weights.certifications);

    let total = f64::from(weights.total().max(1));
    ((earned / total) * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Parse the visible text of a profile page into a record.
///
/// # Errors
/// Fails only when the surface itself is unreadable (empty text).
pub fn extract(surface: &str) -> Result<ProfileRecord> {
    if surface.trim().is_empty() {
        return Err(EngineError::ExtractionUnreadable(
            "page surface is empty".to_string(),
        ));
    }

    let lines: Vec<&str> = surface.lines().map(str::trim).collect();

    let record = ProfileRecord {
        name: extract_name(&lines),
        headline: extract_headline(&lines),
        location: extract_location(&lines),
        summary: extract_summary(&lines),
        experience: extract_experience(&lines),
        education: extract_education(&lines),
        skills: extract_skills(&lines),
        certifications: extract_certifications(&lines),
        languages: extract_languages(&lines),
        links: extract_links(surface),
        extracted_at: Some(Utc::now()),
    };

    tracing::debug!(
        "Extracted record for {} ({} experience, {} skills)",
        record.name.as_deref().unwrap_or("<unnamed>"),
        record.experience.len(),
        record.skills.len()
    );

    Ok(record)
}

fn is_noise(line: &str) -> bool {
    let lower = line.to_lowercase();
    NOISE_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn is_heading(line: &str, headings: &[&str]) -> bool {
    let lower = line.trim().to_lowercase();
    headings
        .iter()
        .any(|h| lower == *h || (lower.starts_with(h) && lower.len() <= h.len() + 12))
}

/// Lines between a section heading and the next known heading.
///
/// Blank lines are kept so callers can split entries on them.
fn section<'a>(lines: &[&'a str], headings: &[&str]) -> Vec<&'a str> {
    let Some(start) = lines.iter().position(|l| is_heading(l, headings)) else {
        return Vec::new();
    };

    let mut collected = Vec::new();
    for line in &lines[start + 1..] {
        if !line.is_empty() && is_heading(line, ALL_HEADINGS) {
            break;
        }
        collected.push(*line);
    }
    collected
}

/// Split a section into entry blocks separated by blank lines, dropping
/// noise lines inside each block.
fn blocks<'a>(section_lines: &[&'a str]) -> Vec<Vec<&'a str>> {
    let mut result = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in section_lines {
        if line.is_empty() {
            if !current.is_empty() {
                result.push(std::mem::take(&mut current));
            }
        } else if !is_noise(line) {
            current.push(line);
        }
    }
    if !current.is_empty() {
        result.push(current);
    }
    result
}

fn extract_name(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .take(20)
        .filter(|l| !l.is_empty() && !is_noise(l) && !is_heading(l, ALL_HEADINGS))
        .find(|l| {
            l.len() > 2
                && l.len() < 100
                && !l.chars().take(5).any(|c| c.is_ascii_digit())
        })
        .map(|l| (*l).to_string())
}

fn extract_headline(lines: &[&str]) -> Option<String> {
    const JOB_KEYWORDS: &[&str] = &[
        "Engineer",
        "Manager",
        "Developer",
        "Analyst",
        "Consultant",
        "Specialist",
        "Director",
        "Lead",
        "Senior",
        "Junior",
        "Founder",
        "Architect",
    ];

    lines
        .iter()
        .skip(1)
        .take(9)
        .filter(|l| !is_noise(l))
        .find(|l| l.len() > 5 && l.len() < 300 && JOB_KEYWORDS.iter().any(|kw| l.contains(kw)))
        .map(|l| (*l).to_string())
}

fn extract_location(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .take(15)
        .filter(|l| !l.is_empty() && !is_noise(l) && !is_heading(l, ALL_HEADINGS))
        .find(|l| {
            (l.contains(',') && l.len() > 3 && l.len() < 100)
                || ["Area", "Remote", "Based"].iter().any(|kw| l.contains(kw))
        })
        .map(|l| (*l).to_string())
}

fn extract_summary(lines: &[&str]) -> Option<String> {
    let body: Vec<&str> = section(lines, ABOUT_HEADINGS)
        .into_iter()
        .filter(|l| !l.is_empty() && !is_noise(l))
        .collect();

    if body.is_empty() {
        None
    } else {
        Some(body.join(" "))
    }
}

fn extract_experience(lines: &[&str]) -> Vec<ExperienceEntry> {
    let mut entries = Vec::new();

    for block in blocks(&section(lines, EXPERIENCE_HEADINGS)) {
        let mut block_lines = block.into_iter();
        let Some(title) = block_lines.next() else {
            continue;
        };

        let mut entry = ExperienceEntry {
            title: title.to_string(),
            ..ExperienceEntry::default()
        };
        let mut description = Vec::new();

        for line in block_lines {
            if entry.date_range.is_none() && year_re().is_match(line) {
                entry.date_range = Some(line.to_string());
            } else if entry.company.is_none() {
                entry.company = Some(line.to_string());
            } else {
                description.push(line);
            }
        }

        if !description.is_empty() {
            entry.description = Some(description.join(" "));
        }
        entries.push(entry);
    }

    entries
}

fn extract_education(lines: &[&str]) -> Vec<EducationEntry> {
    let mut entries = Vec::new();

    for block in blocks(&section(lines, EDUCATION_HEADINGS)) {
        let mut block_lines = block.into_iter();
        let Some(school) = block_lines.next() else {
            continue;
        };

        let mut entry = EducationEntry {
            school: school.to_string(),
            ..EducationEntry::default()
        };

        for line in block_lines {
            if entry.date_range.is_none() && year_re().is_match(line) {
                entry.date_range = Some(line.to_string());
            } else if entry.degree.is_none() {
                entry.degree = Some(line.to_string());
            }
        }

        entries.push(entry);
    }

    entries
}

fn extract_skills(lines: &[&str]) -> Vec<Skill> {
    let mut skills = Vec::new();
    let mut seen = Vec::new();

    for line in section(lines, SKILLS_HEADINGS) {
        // Endorsement counts must survive the noise filter here; they are
        // data in this section, not chrome
        let lower = line.to_lowercase();
        if line.is_empty()
            || ["http", "follow", "message", "button", "connect"]
                .iter()
                .any(|marker| lower.contains(marker))
        {
            continue;
        }

        let endorsements = endorsement_re()
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok());
        let name = endorsement_re().replace(line, "").trim().to_string();

        if name.len() > 1 && name.len() < 100 && !seen.contains(&name) {
            seen.push(name.clone());
            skills.push(Skill { name, endorsements });
        }
    }

    skills
}

fn extract_certifications(lines: &[&str]) -> Vec<Certification> {
    let mut certs = Vec::new();

    for block in blocks(&section(lines, CERTIFICATION_HEADINGS)) {
        let mut block_lines = block.into_iter();
        let Some(name) = block_lines.next() else {
            continue;
        };

        let mut cert = Certification {
            name: name.to_string(),
            ..Certification::default()
        };

        for line in block_lines {
            if cert.issued.is_none() && line.chars().any(|c| c.is_ascii_digit()) {
                cert.issued = Some(line.to_string());
            } else if cert.issuer.is_none() {
                cert.issuer = Some(line.to_string());
            }
        }

        certs.push(cert);
    }

    certs
}

fn extract_languages(lines: &[&str]) -> Vec<String> {
    let mut languages = Vec::new();

    for line in section(lines, LANGUAGE_HEADINGS) {
        if !line.is_empty()
            && !is_noise(line)
            && line.len() > 1
            && line.len() < 50
            && !languages.contains(&line.to_string())
        {
            languages.push(line.to_string());
        }
    }

    languages
}

fn extract_links(surface: &str) -> Vec<String> {
    let mut links = Vec::new();
    for m in link_re().find_iter(surface) {
        let link = m.as_str().trim_end_matches(['.', ',']).to_string();
        if !links.contains(&link) {
            links.push(link);
        }
    }
    links
}
