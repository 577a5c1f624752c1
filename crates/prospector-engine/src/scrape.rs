//! Scrape stage: drive claimed targets through navigation and extraction.
//!
//! Per-target failures are converted into work store `fail` calls at this
//! boundary; only store faults and session-level conditions propagate. The
//! per-attempt flow is claim, navigate, bounded dialog dismissal,
//! access/challenge classification, extraction, then `complete` or `fail`.

use crate::error::{EngineError, Result};
use crate::extract::{self, CompletenessWeights};
use prospector_browser::{BehaviorPolicy, InputAction, NavigationCapability};
use prospector_core::record::ProfileRecord;
use prospector_core::{ProfileUrl, TargetState};
use prospector_store::{Target, WorkStore};
use rand::Rng;
use tokio_util::sync::CancellationToken;

/// Dialogs reappear per navigation; bound the dismissal loop.
const MAX_DIALOG_PASSES: u32 = 3;

/// Phrases meaning this one profile is closed, not that we are blocked.
const ACCESS_RESTRICTED: &[&str] = &[
    "this profile is not available",
    "you cannot view this profile",
    "profile is not public",
    "404 error",
    "page not found",
];

/// Phrases meaning the source is refusing the session itself.
const BLOCK_SIGNALS: &[&str] = &[
    "access denied",
    "unusual traffic",
    "verify you are human",
    "we suspect unusual activity",
];

fn find_block_signal(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    BLOCK_SIGNALS.iter().find(|s| lower.contains(**s)).copied()
}

fn find_access_restriction(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    ACCESS_RESTRICTED
        .iter()
        .find(|s| lower.contains(**s))
        .copied()
}

/// How a single claimed target ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    /// Record stored; target is `completed`
    Completed {
        /// Completeness score of the stored record
        completeness: u8,
    },
    /// Attempt failed; target is `pending` again or `abandoned`
    Failed {
        /// Captured error summary
        error: String,
        /// Resulting queue state
        state: TargetState,
    },
    /// Challenge detected; target paused as `needs_manual`
    NeedsManual,
    /// Session-level block; target released back to `pending`
    Blocked {
        /// What the source said
        reason: String,
    },
}

/// Result of one `scrape_batch` call.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Per-target outcomes in claim order
    pub outcomes: Vec<(ProfileUrl, TargetOutcome)>,
    /// Whether the batch stopped early on cancellation
    pub cancelled: bool,
}

/// Processes claimed targets one at a time with policy pacing.
pub struct ScrapeStage<'a, N: NavigationCapability> {
    nav: &'a N,
    store: &'a WorkStore,
    policy: &'a BehaviorPolicy,
    max_retries: u32,
    weights: CompletenessWeights,
}

impl<'a, N: NavigationCapability> ScrapeStage<'a, N> {
    /// Create a scrape stage over the given navigator and store.
    pub fn new(
        nav: &'a N,
        store: &'a WorkStore,
        policy: &'a BehaviorPolicy,
        max_retries: u32,
    ) -> Self {
        Self {
            nav,
            store,
            policy,
            max_retries,
            weights: CompletenessWeights::default(),
        }
    }

    /// Override the completeness weight table.
    #[must_use]
    pub fn with_weights(mut self, weights: CompletenessWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Claim up to `batch_size` targets and process them in claim order.
    ///
    /// `progress` is the session-wide completed-work counter owned by the
    /// caller; it feeds the pacing policy and is incremented here on each
    /// completion. Cancellation is observed between targets, never mid
    /// extraction; unprocessed claims are rolled back to `pending`.
    pub async fn scrape_batch(
        &self,
        batch_size: u32,
        progress: &mut u32,
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        let targets = self.store.claim_next(batch_size).await?;
        let mut outcomes = Vec::with_capacity(targets.len());
        let mut cancelled = false;

        for (i, target) in targets.iter().enumerate() {
            if cancel.is_cancelled() {
                self.release_rest(&targets[i..]).await?;
                cancelled = true;
                break;
            }

            if i > 0 || *progress > 0 {
                let delay = self.policy.next_delay(*progress);
                tracing::debug!("Pacing delay: {:.1}s", delay.as_secs_f64());
                tokio::time::sleep(delay).await;
            }

            let outcome = self.process_target(&target.profile_url).await?;
            if matches!(outcome, TargetOutcome::Completed { .. }) {
                *progress += 1;
            }
            let blocked = matches!(outcome, TargetOutcome::Blocked { .. });
            outcomes.push((target.profile_url.clone(), outcome));

            if blocked {
                // No point burning the rest of the batch against a block
                self.release_rest(&targets[i + 1..]).await?;
                break;
            }
        }

        Ok(BatchReport {
            outcomes,
            cancelled,
        })
    }

    async fn release_rest(&self, targets: &[Target]) -> Result<()> {
        for target in targets {
            self.store.release(&target.profile_url).await?;
        }
        Ok(())
    }

    /// Process one claimed target, converting per-target errors into
    /// store transitions. Only store faults escape as `Err`.
    async fn process_target(&self, url: &ProfileUrl) -> Result<TargetOutcome> {
        tracing::info!("Scraping {}", url);

        match self.attempt(url).await {
            Ok((record, completeness)) => {
                self.store.complete(url, &record, completeness).await?;
                tracing::info!(
                    "Completed {} ({}, {}% complete)",
                    url,
                    record.name.as_deref().unwrap_or("<unnamed>"),
                    completeness
                );
                Ok(TargetOutcome::Completed { completeness })
            }
            Err(EngineError::ManualInterventionRequired(reason)) => {
                tracing::warn!("Manual intervention needed for {}: {}", url, reason);
                self.store.pause_manual(url).await?;
                Ok(TargetOutcome::NeedsManual)
            }
            Err(EngineError::Blocked(reason)) => {
                tracing::warn!("Session blocked at {}: {}", url, reason);
                self.store.release(url).await?;
                Ok(TargetOutcome::Blocked { reason })
            }
            Err(EngineError::Store(e)) => Err(e.into()),
            Err(e) => {
                let summary = e.to_string();
                let state = self.store.fail(url, &summary, self.max_retries).await?;
                tracing::warn!("Failed {} ({}): now {}", url, summary, state);
                Ok(TargetOutcome::Failed {
                    error: summary,
                    state,
                })
            }
        }
    }

    async fn attempt(&self, url: &ProfileUrl) -> Result<(ProfileRecord, u8)> {
        self.nav
            .navigate(url.as_str())
            .await
            .map_err(|e| EngineError::transient(&e))?;

        if self
            .nav
            .detect_challenge()
            .await
            .map_err(|e| EngineError::transient(&e))?
        {
            return Err(EngineError::ManualInterventionRequired(
                "challenge presented on profile page".to_string(),
            ));
        }

        for _ in 0..MAX_DIALOG_PASSES {
            match self.nav.simulate_input(InputAction::DismissDialog).await {
                Ok(true) => {}
                _ => break,
            }
        }

        let text = self
            .nav
            .visible_text()
            .await
            .map_err(|e| EngineError::transient(&e))?;

        if let Some(signal) = find_block_signal(&text) {
            return Err(EngineError::Blocked(format!("block signal: {signal}")));
        }
        if let Some(phrase) = find_access_restriction(&text) {
            return Err(EngineError::TransientNavigation(format!(
                "profile not accessible: {phrase}"
            )));
        }

        // Human-plausible motion; side effect only, failures ignored
        let (pixels, x, y) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(400..1200),
                rng.gen_range(50.0..800.0),
                rng.gen_range(50.0..600.0),
            )
        };
        let _ = self
            .nav
            .simulate_input(InputAction::Scroll { pixels })
            .await;
        let _ = self
            .nav
            .simulate_input(InputAction::PointerMove { x, y })
            .await;
        let _ = self.nav.simulate_input(InputAction::ExpandSections).await;

        // Re-read after expansion; truncated sections are now full text
        let text = self
            .nav
            .visible_text()
            .await
            .map_err(|e| EngineError::transient(&e))?;

        let record = extract::extract(&text)?;
        let completeness = extract::completeness(&record, &self.weights);
        Ok((record, completeness))
    }
}
