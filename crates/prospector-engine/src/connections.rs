//! Connections stage: discover targets from the account's own network.
//!
//! Second discovery source beside the search stage. The connections list
//! paginates the same way search results do, so collection reuses the same
//! visible-text link extraction; only the entry URL differs. Connection
//! identifiers feed the same enqueue path, so re-discovery of a known
//! target is a no-op.

use crate::error::{EngineError, Result};
use crate::search::{extract_profile_urls, origin_of};
use prospector_browser::{InputAction, NavigationCapability};
use prospector_store::{EnqueueOutcome, WorkStore};
use std::time::Duration;

/// Default connections list endpoint.
pub const DEFAULT_CONNECTIONS_URL: &str =
    "https://www.linkedin.com/mynetwork/invite-connect/connections/";

/// Discovers targets from the connections list and enqueues them.
pub struct ConnectionsStage<'a, N: NavigationCapability> {
    nav: &'a N,
    store: &'a WorkStore,
    url: String,
    page_settle: Duration,
}

impl<'a, N: NavigationCapability> ConnectionsStage<'a, N> {
    /// Create a connections stage over the given navigator and store.
    pub fn new(nav: &'a N, store: &'a WorkStore) -> Self {
        Self {
            nav,
            store,
            url: DEFAULT_CONNECTIONS_URL.to_string(),
            page_settle: Duration::from_secs(2),
        }
    }

    /// Override the connections list URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Override the per-page settle delay (zero in tests).
    #[must_use]
    pub fn with_page_settle(mut self, settle: Duration) -> Self {
        self.page_settle = settle;
        self
    }

    /// Walk the connections list and enqueue up to `max_results` newly
    /// discovered targets. Returns the number actually enqueued
    /// (re-discoveries of known targets don't count).
    ///
    /// Stops at `max_results`, at the end of the list, or with
    /// [`EngineError::Blocked`] when the source challenges the session.
    pub async fn collect(&self, max_results: u32) -> Result<u32> {
        let origin = origin_of(&self.url).ok_or_else(|| {
            EngineError::TransientNavigation(format!(
                "connections URL has no host: {}",
                self.url
            ))
        })?;

        tracing::info!("Collecting connections (max {})", max_results);

        self.nav
            .navigate(&self.url)
            .await
            .map_err(|e| EngineError::transient(&e))?;
        self.check_blocked().await?;

        let mut enqueued = 0u32;
        let max_pages = max_results / 10 + 2;

        for page in 1..=max_pages {
            // The list renders lazily; scroll to materialize entries
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

            tracing::info!(
                "Connections page {}: {} targets enqueued so far",
                page,
                enqueued
            );
            if enqueued >= max_results {
                break;
            }

            let advanced = self
                .nav
                .simulate_input(InputAction::NextPage)
                .await
                .map_err(|e| EngineError::transient(&e))?;
            if !advanced {
                tracing::info!("Reached end of connections list");
                break;
            }
            self.check_blocked().await?;
            tokio::time::sleep(self.page_settle).await;
        }

        tracing::info!("Connections collection completed: {} targets enqueued", enqueued);
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
                "challenge presented on connections list".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_url_has_origin() {
        assert_eq!(
            origin_of(DEFAULT_CONNECTIONS_URL).as_deref(),
            Some("https://www.linkedin.com")
        );
    }
}
