//! Validation stage: demote low-quality completed records.
//!
//! Runs as an independent pass over all completed targets, so it can run
//! between sessions. A record below the completeness threshold or without
//! a plausible name points at an extraction failure rather than a sparse
//! real profile; such targets are reopened for another attempt.

use crate::error::Result;
use prospector_store::WorkStore;

/// Counts from one validation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Completed records examined
    pub checked: usize,
    /// Records that passed
    pub accepted: usize,
    /// Targets demoted back to `pending`
    pub reopened: usize,
}

/// Re-scores completed records against the acceptance threshold.
pub struct ValidationStage<'a> {
    store: &'a WorkStore,
    min_completeness: u8,
}

impl<'a> ValidationStage<'a> {
    /// Create a validation stage with the given acceptance threshold.
    pub fn new(store: &'a WorkStore, min_completeness: u8) -> Self {
        Self {
            store,
            min_completeness,
        }
    }

    /// Sweep all completed targets, reopening the ones that fail.
    ///
    /// Reopening never resets the retry count, so a target cannot loop
    /// through validation to escape an exhausted retry budget.
    pub async fn validate_all(&self) -> Result<ValidationReport> {
        let records = self.store.list_records(0).await?;
        let mut report = ValidationReport {
            checked: records.len(),
            ..ValidationReport::default()
        };

        for stored in records {
            let reason = if !stored.record.has_plausible_name() {
                Some("missing or implausible name".to_string())
            } else if stored.completeness < self.min_completeness {
                Some(format!(
                    "completeness {} below threshold {}",
                    stored.completeness, self.min_completeness
                ))
            } else {
                None
            };

            match reason {
                Some(reason) => {
                    self.store.reopen(&stored.profile_url, &reason).await?;
                    report.reopened += 1;
                }
                None => report.accepted += 1,
            }
        }

        if report.reopened > 0 {
            tracing::info!(
                "Validation: {} accepted, {} reopened of {}",
                report.accepted,
                report.reopened,
                report.checked
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospector_core::record::ProfileRecord;
    use prospector_core::{ProfileUrl, TargetState};

    async fn completed_target(store: &WorkStore, slug: &str, name: Option<&str>, score: u8) {
        let url =
            ProfileUrl::new(format!("https://www.example.com/in/{slug}")).expect("valid URL");
        store.enqueue(&url).await.expect("enqueue");
        store.claim_next(1).await.expect("claim");
        let record = ProfileRecord {
            name: name.map(String::from),
            ..ProfileRecord::default()
        };
        store.complete(&url, &record, score).await.expect("complete");
    }

    async fn setup_store() -> WorkStore {
        let store = WorkStore::open(":memory:").await.expect("open store");
        store.run_migrations().await.expect("run migrations");
        store
    }

    async fn state_of(store: &WorkStore, slug: &str) -> TargetState {
        let url =
            ProfileUrl::new(format!("https://www.example.com/in/{slug}")).expect("valid URL");
        store.get(&url).await.expect("get target").state
    }

    #[tokio::test]
    async fn test_low_score_is_reopened() {
        let store = setup_store().await;
        completed_target(&store, "sparse", Some("Jane Doe"), 20).await;
        completed_target(&store, "rich", Some("John Roe"), 85).await;

        let report = ValidationStage::new(&store, 40)
            .validate_all()
            .await
            .expect("validate");

        assert_eq!(report.checked, 2);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.reopened, 1);
        assert_eq!(state_of(&store, "sparse").await, TargetState::Pending);
        assert_eq!(state_of(&store, "rich").await, TargetState::Completed);
    }

    #[tokio::test]
    async fn test_missing_name_is_reopened_despite_score() {
        let store = setup_store().await;
        completed_target(&store, "anon", None, 90).await;

        let report = ValidationStage::new(&store, 40)
            .validate_all()
            .await
            .expect("validate");

        assert_eq!(report.reopened, 1);
        assert_eq!(state_of(&store, "anon").await, TargetState::Pending);
    }

    #[tokio::test]
    async fn test_reopened_target_is_claimable_again() {
        let store = setup_store().await;
        completed_target(&store, "sparse", Some("Jane Doe"), 5).await;

        ValidationStage::new(&store, 40)
            .validate_all()
            .await
            .expect("validate");

        let claimed = store.claim_next(10).await.expect("claim");
        assert_eq!(claimed.len(), 1);
        let reason = claimed[0].last_error.as_deref().expect("reopen reason");
        assert!(reason.contains("below threshold"));
    }

    #[tokio::test]
    async fn test_empty_store_is_fine() {
        let store = setup_store().await;
        let report = ValidationStage::new(&store, 40)
            .validate_all()
            .await
            .expect("validate");
        assert_eq!(report, ValidationReport::default());
    }
}
