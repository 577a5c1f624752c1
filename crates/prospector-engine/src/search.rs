//! Search stage: discover targets and enqueue them.
//!
//! Candidate identifiers are pulled out of the visible text by pattern
//! matching, never by DOM position, so result-page redesigns degrade to
//! fewer matches instead of a broken stage. Retry is an orchestrator
//! concern; this stage reports blocks and gives up.

use crate::error::{EngineError, Result};
use prospector_browser::{InputAction, NavigationCapability};
use prospector_core::ProfileUrl;
use prospector_store::{EnqueueOutcome, WorkStore};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

/// Default people-search endpoint.
pub const DEFAULT_SEARCH_BASE: &str = "https://www.linkedin.com/search/results/people/";

fn profile_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(https?://[A-Za-z0-9.-]+)?/in/[A-Za-z0-9%_-]+").expect("valid regex")
    })
}

/// Build the search results URL for a query, percent-encoding as needed.
#[must_use]
pub fn build_search_url(base: &str, query: &str) -> Option<String> {
    let mut url = Url::parse(base).ok()?;
    url.query_pairs_mut().append_pair("keywords", query);
    Some(url.to_string())
}

/// Candidate profile URLs found in a page's visible text, in page order.
///
/// Relative `/in/<slug>` links are resolved against `origin`; anything
/// that fails canonical validation is dropped.
#[must_use]
pub fn extract_profile_urls(text: &str, origin: &str) -> Vec<ProfileUrl> {
    let mut found = Vec::new();
    for m in profile_link_re().find_iter(text) {
        let raw = m.as_str();
        let candidate = if raw.starts_with("http") {
            raw.to_string()
        } else {
            format!("{origin}{raw}")
        };
        if let Ok(url) = ProfileUrl::new(candidate) {
            if !found.contains(&url) {
                found.push(url);
            }
        }
    }
    found
}

/// Discovers targets for a query and enqueues them into the work store.
pub struct SearchStage<'a, N: NavigationCapability> {
    nav: &'a N,
    store: &'a WorkStore,
    base: String,
    page_settle: Duration,
}

impl<'a, N: NavigationCapability> SearchStage<'a, N> {
    /// Create a search stage over the given navigator and store.
    pub fn new(nav: &'a N, store: &'a WorkStore) -> Self {
        Self {
            nav,
            store,
            base: DEFAULT_SEARCH_BASE.to_string(),
            page_settle: Duration::from_secs(2),
        }
    }

    /// Override the search endpoint.
    #[must_use]
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Override the per-page settle delay (zero in tests).
    #[must_use]
    pub fn with_page_settle(mut self, settle: Duration) -> Self {
        self.page_settle = settle;
        self
    }

    /// Run a search and enqueue up to `max_results` newly discovered
    /// targets. Returns the number actually enqueued (re-discoveries of
    /// known targets don't count).
    ///
    /// Stops at `max_results`, at the end of pagination, or with
    /// [`EngineError::Blocked`] when the source challenges the session.
    pub async fn search(&self, query: &str, max_results: u32) -> Result<u32> {
        let search_url = build_search_url(&self.base, query).ok_or_else(|| {
            EngineError::TransientNavigation(format!("invalid search base URL: {}", self.base))
        })?;
        let origin = origin_of(&search_url).ok_or_else(|| {
            EngineError::TransientNavigation(format!("search URL has no host: {search_url}"))
        })?;

        tracing::info!("Searching for \"{}\" (max {})", query, max_results);

        self.nav
            .navigate(&search_url)
            .await
            .map_err(|e| EngineError::transient(&e))?;
        self.check_blocked().await?;

        let mut enqueued = 0u32;
        let max_pages = max_results / 10 + 2;

        for page in 1..=max_pages {
            // Scrolling loads lazily-rendered results; purely side-effecting
            let _ = self
                .nav
                .simulate_input(InputAction::Scroll { pixels: 600 })
                .await;
            tokio::time::sleep(self.page_settle).await;

            let text = self
                .nav
                .visible_text()
                .await
                .map_err(|e| EngineError::transient(&e))?;

            for url in extract_profile_urls(&text, &origin) {
                if enqueued >= max_results {
                    break;
                }
                if self.store.enqueue(&url).await? == EnqueueOutcome::Created {
                    enqueued += 1;
                }
            }

            tracing::info!("Search page {}: {} targets enqueued so far", page, enqueued);
            if enqueued >= max_results {
                break;
            }

            let advanced = self
                .nav
                .simulate_input(InputAction::NextPage)
                .await
                .map_err(|e| EngineError::transient(&e))?;
            if !advanced {
                tracing::info!("Reached end of search results");
                break;
            }
            self.check_blocked().await?;
            tokio::time::sleep(self.page_settle).await;
        }

        tracing::info!("Search completed: {} targets enqueued", enqueued);
        Ok(enqueued)
    }

    async fn check_blocked(&self) -> Result<()> {
        let challenged = self
            .nav
            .detect_challenge()
            .await
            .map_err(|e| EngineError::transient(&e))?;
        if challenged {
            return Err(EngineError::Blocked(
                "challenge presented on search results".to_string(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(format!("{}://{host}", parsed.scheme()))
}
