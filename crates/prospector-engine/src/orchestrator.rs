//! Session orchestrator.
//!
//! Drives repeated claim/scrape batches with periodic validation sweeps
//! until the queue drains, a budget runs out, or the session must halt.
//! All progress lives in the work store, so resumption is simply running
//! another session; the only startup duty is reclaiming targets a crashed
//! session left claimed.

use crate::error::Result;
use crate::scrape::{ScrapeStage, TargetOutcome};
use crate::validate::ValidationStage;
use chrono::{DateTime, Utc};
use prospector_browser::{BehaviorPolicy, NavigationCapability};
use prospector_core::config::AppConfig;
use prospector_store::{StoreStats, WorkStore};
use std::fmt;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Consecutive manual-intervention signals tolerated before halting.
const DEFAULT_MAX_CONSECUTIVE_MANUAL: u32 = 3;

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// No pending targets remain
    QueueDrained,
    /// The configured profile budget was spent
    ProfileBudgetReached,
    /// The configured time budget was spent
    TimeBudgetReached,
    /// The source is refusing the session
    Blocked(String),
    /// Too many consecutive challenges; a human needs to look
    RepeatedManualIntervention,
    /// The cancellation token fired
    Cancelled,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueDrained => write!(f, "queue drained"),
            Self::ProfileBudgetReached => write!(f, "profile budget reached"),
            Self::TimeBudgetReached => write!(f, "time budget reached"),
            Self::Blocked(reason) => write!(f, "blocked: {reason}"),
            Self::RepeatedManualIntervention => write!(f, "repeated manual intervention"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Final accounting for one session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// When the session started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration
    pub duration: Duration,
    /// Why the session ended
    pub halt_reason: HaltReason,
    /// Targets processed this session
    pub attempted: u32,
    /// Targets completed this session
    pub succeeded: u32,
    /// Targets failed this session
    pub failed: u32,
    /// Manual-intervention pauses this session
    pub manual_interventions: u32,
    /// Targets reclaimed from a crashed predecessor at startup
    pub reclaimed_at_startup: u64,
    /// Store-wide per-state counts at session end
    pub stats: StoreStats,
}

/// Session tuning knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Targets claimed per batch
    pub batch_size: u32,
    /// Retry budget per target
    pub max_retries: u32,
    /// Validation acceptance threshold
    pub min_completeness: u8,
    /// Run a validation sweep every N batches (0 disables periodic sweeps)
    pub validate_every_batches: u32,
    /// Stop after this many attempted targets (0 = unlimited)
    pub max_profiles: u32,
    /// Stop after this much wall-clock time
    pub max_duration: Option<Duration>,
    /// Consecutive manual-intervention signals tolerated before halting
    pub max_consecutive_manual: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_retries: 3,
            min_completeness: 40,
            validate_every_batches: 5,
            max_profiles: 0,
            max_duration: None,
            max_consecutive_manual: DEFAULT_MAX_CONSECUTIVE_MANUAL,
        }
    }
}

impl OrchestratorConfig {
    /// Derive session tuning from the application config.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            batch_size: config.scraping.batch_size,
            max_retries: config.scraping.max_retries,
            min_completeness: config.validation.min_completeness,
            validate_every_batches: config.session.validate_every_batches,
            max_profiles: config.session.max_profiles,
            max_duration: match config.session.max_minutes {
                0 => None,
                minutes => Some(Duration::from_secs(minutes * 60)),
            },
            max_consecutive_manual: DEFAULT_MAX_CONSECUTIVE_MANUAL,
        }
    }
}

/// Sequences search, scrape, and validation into a resumable session.
pub struct Orchestrator<'a, N: NavigationCapability> {
    nav: &'a N,
    store: &'a WorkStore,
    policy: &'a BehaviorPolicy,
    config: OrchestratorConfig,
}

impl<'a, N: NavigationCapability> Orchestrator<'a, N> {
    /// Create an orchestrator over the given navigator, store, and policy.
    pub fn new(
        nav: &'a N,
        store: &'a WorkStore,
        policy: &'a BehaviorPolicy,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            nav,
            store,
            policy,
            config,
        }
    }

    /// Run one session to completion.
    ///
    /// Cancellation is observed at per-target boundaries; a cancelled
    /// session leaves no target stuck `in_progress`.
    pub async fn run_session(&self, cancel: &CancellationToken) -> Result<SessionReport> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let cfg = &self.config;

        // Anything still claimed at startup was abandoned by a crash
        let reclaimed_at_startup = self.store.reclaim_stale().await?;

        let scrape = ScrapeStage::new(self.nav, self.store, self.policy, cfg.max_retries);
        let validation = ValidationStage::new(self.store, cfg.min_completeness);

        let mut progress = 0u32;
        let mut attempted = 0u32;
        let mut succeeded = 0u32;
        let mut failed = 0u32;
        let mut manual_interventions = 0u32;
        let mut consecutive_manual = 0u32;
        let mut batches = 0u32;
        let mut final_sweep_done = false;

        let halt_reason = loop {
            if cancel.is_cancelled() {
                break HaltReason::Cancelled;
            }
            if cfg.max_profiles > 0 && attempted >= cfg.max_profiles {
                break HaltReason::ProfileBudgetReached;
            }
            if let Some(limit) = cfg.max_duration {
                if clock.elapsed() >= limit {
                    break HaltReason::TimeBudgetReached;
                }
            }

            let batch_size = if cfg.max_profiles > 0 {
                cfg.batch_size.min(cfg.max_profiles - attempted)
            } else {
                cfg.batch_size
            };

            let batch = scrape.scrape_batch(batch_size, &mut progress, cancel).await?;

            if batch.outcomes.is_empty() && !batch.cancelled {
                // One final sweep may reopen low-quality work; a second
                // empty queue after that really is drained
                if final_sweep_done {
                    break HaltReason::QueueDrained;
                }
                final_sweep_done = true;
                let sweep = validation.validate_all().await?;
                if sweep.reopened == 0 {
                    break HaltReason::QueueDrained;
                }
                continue;
            }

            let mut blocked_reason = None;
            for (_, outcome) in &batch.outcomes {
                match outcome {
                    TargetOutcome::Completed { .. } => {
                        attempted += 1;
                        succeeded += 1;
                        consecutive_manual = 0;
                    }
                    TargetOutcome::Failed { .. } => {
                        attempted += 1;
                        failed += 1;
                        consecutive_manual = 0;
                    }
                    TargetOutcome::NeedsManual => {
                        attempted += 1;
                        manual_interventions += 1;
                        consecutive_manual += 1;
                    }
                    TargetOutcome::Blocked { reason } => {
                        blocked_reason = Some(reason.clone());
                    }
                }
            }

            if let Some(reason) = blocked_reason {
                break HaltReason::Blocked(reason);
            }
            if consecutive_manual >= cfg.max_consecutive_manual {
                break HaltReason::RepeatedManualIntervention;
            }
            if batch.cancelled {
                break HaltReason::Cancelled;
            }

            batches += 1;
            if cfg.validate_every_batches > 0 && batches % cfg.validate_every_batches == 0 {
                validation.validate_all().await?;
            }
        };

        let stats = self.store.stats().await?;
        let report = SessionReport {
            started_at,
            duration: clock.elapsed(),
            halt_reason,
            attempted,
            succeeded,
            failed,
            manual_interventions,
            reclaimed_at_startup,
            stats,
        };

        tracing::info!(
            "Session ended ({}): {} attempted, {} succeeded, {} failed, {} manual; \
             store: {} pending, {} completed, {} needs_manual, {} abandoned",
            report.halt_reason,
            report.attempted,
            report.succeeded,
            report.failed,
            report.manual_interventions,
            report.stats.pending,
            report.stats.completed,
            report.stats.needs_manual,
            report.stats.abandoned,
        );

        Ok(report)
    }
}
