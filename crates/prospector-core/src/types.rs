//! Shared types used across the Prospector workspace.
//!
//! This module defines common newtypes and enums that provide type safety
//! and clear domain modeling for the work queue.

use crate::error::CoreError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Newtype for canonical profile URLs with validation.
///
/// A profile URL is the globally unique identifier of a scrape target.
/// It must be an `https` URL whose path is `/in/<slug>`; query strings and
/// fragments are stripped during canonicalization so that re-discovery of
/// the same profile always maps to the same identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileUrl(String);

impl ProfileUrl {
    /// Create a new `ProfileUrl` from a string, canonicalizing it.
    ///
    /// # Errors
    /// Returns error if the URL is not a valid https profile URL.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CoreError> {
        let url = url::Url::parse(raw.as_ref())
            .map_err(|e| CoreError::Validation(format!("invalid profile URL: {e}")))?;

        if url.scheme() != "https" {
            return Err(CoreError::Validation(format!(
                "invalid profile URL: expected https scheme, got '{}'",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| CoreError::Validation("invalid profile URL: no host".to_string()))?;

        Self::validate_path(url.path())?;

        // Canonical form: scheme + host + path, no query/fragment, no trailing slash
        let path = url.path().trim_end_matches('/');
        Ok(Self(format!("https://{host}{path}")))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate the path component: `/in/<slug>` with a URL-safe slug.
    fn validate_path(path: &str) -> Result<(), CoreError> {
        static PATH_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = PATH_REGEX
            .get_or_init(|| Regex::new(r"^/in/[A-Za-z0-9%_-]+/?$").expect("valid regex"));

        if regex.is_match(path) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "invalid profile URL: path must be /in/<slug>, got '{path}'"
            )))
        }
    }
}

impl fmt::Display for ProfileUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a scrape target.
///
/// Legal transitions:
///
/// ```text
/// pending -> in_progress -> {completed | failed | needs_manual}
/// failed -> {pending | abandoned}    (store decides by retry budget)
/// completed -> pending               (validation reopen)
/// needs_manual -> pending            (external resolution)
/// in_progress -> pending             (cancellation rollback / crash reclaim)
/// ```
///
/// `completed` and `abandoned` are terminal unless explicitly reopened.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    /// Discovered and waiting to be claimed
    Pending,
    /// Claimed by a scrape worker
    InProgress,
    /// Successfully scraped; record stored
    Completed,
    /// Last attempt failed; eligible for retry
    Failed,
    /// Paused awaiting manual intervention (e.g. CAPTCHA); not retried
    NeedsManual,
    /// Retry budget exhausted; terminal
    Abandoned,
}

impl TargetState {
    /// Whether a transition from `self` to `next` is legal.
    #[must_use]
    pub fn can_transition_to(self, next: TargetState) -> bool {
        use TargetState::{Abandoned, Completed, Failed, InProgress, NeedsManual, Pending};
        matches!(
            (self, next),
            (Pending, InProgress)
                | (InProgress, Completed | Failed | NeedsManual | Pending)
                | (Failed, Pending | Abandoned)
                | (Completed, Pending)
                | (NeedsManual, Pending)
        )
    }

    /// Whether this state is terminal absent an explicit reopen.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, TargetState::Completed | TargetState::Abandoned)
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::NeedsManual => "needs_manual",
            Self::Abandoned => "abandoned",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TargetState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "needs_manual" => Ok(Self::NeedsManual),
            "abandoned" => Ok(Self::Abandoned),
            other => Err(CoreError::Validation(format!(
                "unknown target state '{other}'"
            ))),
        }
    }
}
