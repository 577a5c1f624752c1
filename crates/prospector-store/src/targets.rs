//! Target queue operations.
//!
//! All durable state of the scraping pipeline lives in the `targets` table
//! and is mutated exclusively through the functions in this module. Each
//! mutator enforces the target state machine: an operation that observes a
//! row in the wrong state fails with [`StoreError::InvalidStateTransition`]
//! and leaves the row untouched.

use crate::error::{Result, StoreError};
use chrono::{DateTime, Utc};
use prospector_core::record::ProfileRecord;
use prospector_core::{ProfileUrl, TargetState};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// A discovered scrape target and its queue state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Canonical profile URL (primary key)
    pub profile_url: ProfileUrl,
    /// Current queue state
    pub state: TargetState,
    /// Failed attempts so far
    pub retry_count: u32,
    /// Error summary from the most recent failed attempt
    pub last_error: Option<String>,
    /// When the target was first discovered
    pub discovered_at: DateTime<Utc>,
    /// When the target was last claimed or failed
    pub last_attempt_at: Option<DateTime<Utc>>,
}

/// Outcome of an [`enqueue`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// A new target row was created in `pending` state
    Created,
    /// The identifier was already known; existing state untouched
    AlreadyExists,
}

/// A completed record as stored, for validation and export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    /// The owning target's profile URL
    pub profile_url: ProfileUrl,
    /// The extracted record
    pub record: ProfileRecord,
    /// Completeness score (0-100)
    pub completeness: u8,
}

/// A target that has failed at least once, for failure reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedTarget {
    /// The target's profile URL
    pub profile_url: ProfileUrl,
    /// Current state (`pending` if retryable, `abandoned` if exhausted)
    pub state: TargetState,
    /// Error summary from the most recent failed attempt
    pub last_error: Option<String>,
    /// Failed attempts so far
    pub retry_count: u32,
}

/// Per-state row counts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreStats {
    /// Targets waiting to be claimed
    pub pending: u64,
    /// Targets currently claimed
    pub in_progress: u64,
    /// Targets with a stored record
    pub completed: u64,
    /// Targets paused for manual intervention
    pub needs_manual: u64,
    /// Targets whose retry budget is exhausted
    pub abandoned: u64,
}

impl StoreStats {
    /// Total number of known targets.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.pending + self.in_progress + self.completed + self.needs_manual + self.abandoned
    }
}

type TargetRow = (
    String,
    String,
    i64,
    Option<String>,
    String,
    Option<String>,
);

fn decode_target(row: TargetRow) -> Result<Target> {
    let (url, state, retry_count, last_error, discovered_at, last_attempt_at) = row;
    Ok(Target {
        profile_url: decode_url(&url)?,
        state: state
            .parse()
            .map_err(|e| StoreError::Decode(format!("bad state for {url}: {e}")))?,
        retry_count: u32::try_from(retry_count)
            .map_err(|_| StoreError::Decode(format!("negative retry_count for {url}")))?,
        last_error,
        discovered_at: decode_timestamp(&url, &discovered_at)?,
        last_attempt_at: last_attempt_at
            .as_deref()
            .map(|ts| decode_timestamp(&url, ts))
            .transpose()?,
    })
}

fn decode_url(url: &str) -> Result<ProfileUrl> {
    ProfileUrl::new(url).map_err(|e| StoreError::Decode(format!("bad profile_url in store: {e}")))
}

fn decode_timestamp(url: &str, ts: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("bad timestamp for {url}: {e}")))
}

async fn current_state(pool: &SqlitePool, url: &ProfileUrl) -> Result<TargetState> {
    let state: Option<(String,)> =
        sqlx::query_as("SELECT state FROM targets WHERE profile_url = ?")
            .bind(url.as_str())
            .fetch_optional(pool)
            .await?;

    match state {
        Some((s,)) => s
            .parse()
            .map_err(|e| StoreError::Decode(format!("bad state for {url}: {e}"))),
        None => Err(StoreError::NotFound(url.to_string())),
    }
}

/// Idempotently insert a discovered target in `pending` state.
///
/// Re-discovery of a known identifier is a no-op: the existing row keeps
/// its state, retry count, and record.
pub async fn enqueue(pool: &SqlitePool, url: &ProfileUrl) -> Result<EnqueueOutcome> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO targets (profile_url, state, discovered_at)
         VALUES (?, 'pending', ?)",
    )
    .bind(url.as_str())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        tracing::debug!("Enqueued target {}", url);
        Ok(EnqueueOutcome::Created)
    } else {
        Ok(EnqueueOutcome::AlreadyExists)
    }
}

/// Atomically claim up to `batch_size` pending targets.
///
/// Claimed targets move to `in_progress` in a single statement, so no two
/// concurrent claimers can receive the same target. Returned targets are
/// ordered by discovery time (claim order).
pub async fn claim_next(pool: &SqlitePool, batch_size: u32) -> Result<Vec<Target>> {
    let rows: Vec<TargetRow> = sqlx::query_as(
        "UPDATE targets
         SET state = 'in_progress', last_attempt_at = ?
         WHERE profile_url IN (
             SELECT profile_url FROM targets
             WHERE state = 'pending'
             ORDER BY discovered_at, profile_url
             LIMIT ?
         )
         RETURNING profile_url, state, retry_count, last_error, discovered_at, last_attempt_at",
    )
    .bind(Utc::now().to_rfc3339())
    .bind(i64::from(batch_size))
    .fetch_all(pool)
    .await?;

    let mut targets = rows
        .into_iter()
        .map(decode_target)
        .collect::<Result<Vec<_>>>()?;
    targets.sort_by(|a, b| {
        a.discovered_at
            .cmp(&b.discovered_at)
            .then_with(|| a.profile_url.as_str().cmp(b.profile_url.as_str()))
    });

    tracing::debug!("Claimed {} targets", targets.len());
    Ok(targets)
}

/// Store a record for an `in_progress` target and mark it `completed`.
///
/// Resets the retry count: a successful scrape clears the failure history.
pub async fn complete(
    pool: &SqlitePool,
    url: &ProfileUrl,
    record: &ProfileRecord,
    completeness: u8,
) -> Result<()> {
    let blob = serde_json::to_string(record)
        .map_err(|e| StoreError::Decode(format!("record serialization failed: {e}")))?;

    let result = sqlx::query(
        "UPDATE targets
         SET state = 'completed', record_blob = ?, completeness_score = ?,
             retry_count = 0, last_error = NULL, last_attempt_at = ?
         WHERE profile_url = ? AND state = 'in_progress'",
    )
    .bind(&blob)
    .bind(i64::from(completeness))
    .bind(Utc::now().to_rfc3339())
    .bind(url.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        let from = current_state(pool, url).await?;
        return Err(StoreError::InvalidStateTransition {
            url: url.to_string(),
            from,
            attempted: TargetState::Completed,
        });
    }

    tracing::debug!("Completed target {} (score {})", url, completeness);
    Ok(())
}

/// Record a failed attempt for an `in_progress` target.
///
/// Increments the retry count and returns the target to `pending` while
/// the budget lasts; the attempt that exhausts the budget moves it to the
/// terminal `abandoned` state. Returns the resulting state.
pub async fn fail(
    pool: &SqlitePool,
    url: &ProfileUrl,
    error: &str,
    max_retries: u32,
) -> Result<TargetState> {
    let mut tx = pool.begin().await?;

    let row: Option<(String, i64)> =
        sqlx::query_as("SELECT state, retry_count FROM targets WHERE profile_url = ?")
            .bind(url.as_str())
            .fetch_optional(&mut *tx)
            .await?;

    let Some((state, retry_count)) = row else {
        return Err(StoreError::NotFound(url.to_string()));
    };
    let state: TargetState = state
        .parse()
        .map_err(|e| StoreError::Decode(format!("bad state for {url}: {e}")))?;

    if state != TargetState::InProgress {
        return Err(StoreError::InvalidStateTransition {
            url: url.to_string(),
            from: state,
            attempted: TargetState::Failed,
        });
    }

    let new_retry_count = retry_count + 1;
    let next_state = if new_retry_count < i64::from(max_retries) {
        TargetState::Pending
    } else {
        TargetState::Abandoned
    };

    // Truncate error summaries so a pathological page cannot bloat the store
    let error_summary: String = error.chars().take(500).collect();

    sqlx::query(
        "UPDATE targets
         SET state = ?, retry_count = ?, last_error = ?, last_attempt_at = ?
         WHERE profile_url = ?",
    )
    .bind(next_state.to_string())
    .bind(new_retry_count)
    .bind(&error_summary)
    .bind(Utc::now().to_rfc3339())
    .bind(url.as_str())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::debug!(
        "Failed target {} (attempt {}, now {})",
        url,
        new_retry_count,
        next_state
    );
    Ok(next_state)
}

/// Validation-triggered reopen: `completed -> pending`.
///
/// Deliberately does not reset the retry count, so a target cannot cycle
/// through reopen to mask an exhausted retry budget.
pub async fn reopen(pool: &SqlitePool, url: &ProfileUrl, reason: &str) -> Result<()> {
    let result = sqlx::query(
        "UPDATE targets
         SET state = 'pending', last_error = ?
         WHERE profile_url = ? AND state = 'completed'",
    )
    .bind(format!("reopened: {reason}"))
    .bind(url.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        let from = current_state(pool, url).await?;
        return Err(StoreError::InvalidStateTransition {
            url: url.to_string(),
            from,
            attempted: TargetState::Pending,
        });
    }

    tracing::info!("Reopened target {} ({})", url, reason);
    Ok(())
}

/// Cancellation rollback: `in_progress -> pending` without touching the
/// retry count or error fields.
pub async fn release(pool: &SqlitePool, url: &ProfileUrl) -> Result<()> {
    let result = sqlx::query(
        "UPDATE targets SET state = 'pending'
         WHERE profile_url = ? AND state = 'in_progress'",
    )
    .bind(url.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        let from = current_state(pool, url).await?;
        return Err(StoreError::InvalidStateTransition {
            url: url.to_string(),
            from,
            attempted: TargetState::Pending,
        });
    }

    tracing::debug!("Released target {}", url);
    Ok(())
}

/// Pause an `in_progress` target awaiting manual intervention.
///
/// The pause is excluded from retry accounting: the retry count is not
/// incremented, since the failure is external, not the target's.
pub async fn pause_manual(pool: &SqlitePool, url: &ProfileUrl) -> Result<()> {
    let result = sqlx::query(
        "UPDATE targets
         SET state = 'needs_manual', last_attempt_at = ?
         WHERE profile_url = ? AND state = 'in_progress'",
    )
    .bind(Utc::now().to_rfc3339())
    .bind(url.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        let from = current_state(pool, url).await?;
        return Err(StoreError::InvalidStateTransition {
            url: url.to_string(),
            from,
            attempted: TargetState::NeedsManual,
        });
    }

    tracing::warn!("Target {} paused for manual intervention", url);
    Ok(())
}

/// Return all `needs_manual` targets to `pending` after external resolution.
///
/// Returns the number of targets resumed.
pub async fn resume_manual(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("UPDATE targets SET state = 'pending' WHERE state = 'needs_manual'")
        .execute(pool)
        .await?;

    let resumed = result.rows_affected();
    if resumed > 0 {
        tracing::info!("Resumed {} manually-paused targets", resumed);
    }
    Ok(resumed)
}

/// Crash recovery: reclaim `in_progress` targets with no live owner.
///
/// Called at session startup, before any new claim. A target found
/// `in_progress` at that point was abandoned by a crashed session and is
/// returned to `pending` without retry accounting.
pub async fn reclaim_stale(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("UPDATE targets SET state = 'pending' WHERE state = 'in_progress'")
        .execute(pool)
        .await?;

    let reclaimed = result.rows_affected();
    if reclaimed > 0 {
        tracing::warn!("Reclaimed {} targets abandoned by a previous session", reclaimed);
    }
    Ok(reclaimed)
}

/// Fetch a single target by identifier.
pub async fn get(pool: &SqlitePool, url: &ProfileUrl) -> Result<Target> {
    let row: Option<TargetRow> = sqlx::query_as(
        "SELECT profile_url, state, retry_count, last_error, discovered_at, last_attempt_at
         FROM targets WHERE profile_url = ?",
    )
    .bind(url.as_str())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => decode_target(row),
        None => Err(StoreError::NotFound(url.to_string())),
    }
}

/// Per-state row counts.
pub async fn stats(pool: &SqlitePool) -> Result<StoreStats> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT state, COUNT(*) FROM targets GROUP BY state")
            .fetch_all(pool)
            .await?;

    let mut stats = StoreStats::default();
    for (state, count) in rows {
        let count = u64::try_from(count).unwrap_or(0);
        match state.parse::<TargetState>() {
            Ok(TargetState::Pending) => stats.pending = count,
            Ok(TargetState::InProgress) => stats.in_progress = count,
            Ok(TargetState::Completed) => stats.completed = count,
            Ok(TargetState::NeedsManual) => stats.needs_manual = count,
            Ok(TargetState::Abandoned) => stats.abandoned = count,
            Ok(TargetState::Failed) => {
                // `failed` never persists: fail() lands on pending/abandoned
            }
            Err(e) => return Err(StoreError::Decode(format!("bad state in stats: {e}"))),
        }
    }
    Ok(stats)
}

/// All completed records at or above a completeness floor, best first.
pub async fn list_records(pool: &SqlitePool, min_completeness: u8) -> Result<Vec<StoredRecord>> {
    let rows: Vec<(String, String, i64)> = sqlx::query_as(
        "SELECT profile_url, record_blob, completeness_score
         FROM targets
         WHERE state = 'completed' AND record_blob IS NOT NULL AND completeness_score >= ?
         ORDER BY completeness_score DESC, profile_url",
    )
    .bind(i64::from(min_completeness))
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(url, blob, score)| {
            let record: ProfileRecord = serde_json::from_str(&blob)
                .map_err(|e| StoreError::Decode(format!("bad record_blob for {url}: {e}")))?;
            Ok(StoredRecord {
                profile_url: decode_url(&url)?,
                record,
                completeness: u8::try_from(score.clamp(0, 100)).unwrap_or(0),
            })
        })
        .collect()
}

/// Targets that have recorded at least one failure, worst first.
pub async fn failed_targets(pool: &SqlitePool) -> Result<Vec<FailedTarget>> {
    let rows: Vec<(String, String, Option<String>, i64)> = sqlx::query_as(
        "SELECT profile_url, state, last_error, retry_count
         FROM targets
         WHERE retry_count > 0 AND state != 'completed'
         ORDER BY retry_count DESC, profile_url",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(url, state, last_error, retry_count)| {
            Ok(FailedTarget {
                profile_url: decode_url(&url)?,
                state: state
                    .parse()
                    .map_err(|e| StoreError::Decode(format!("bad state for {url}: {e}")))?,
                last_error,
                retry_count: u32::try_from(retry_count).unwrap_or(0),
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::WorkStore;

    async fn setup_store() -> WorkStore {
        let store = WorkStore::open(":memory:").await.expect("create test store");
        store.run_migrations().await.expect("run migrations");
        store
    }

    fn url(slug: &str) -> ProfileUrl {
        ProfileUrl::new(format!("https://www.example.com/in/{slug}")).expect("valid URL")
    }

    fn sample_record(name: &str) -> ProfileRecord {
        ProfileRecord {
            name: Some(name.to_string()),
            ..ProfileRecord::default()
        }
    }

    #[tokio::test]
    async fn test_enqueue_is_idempotent() {
        let store = setup_store().await;
        let target = url("jane-doe");

        assert_eq!(
            enqueue(store.pool(), &target).await.unwrap(),
            EnqueueOutcome::Created
        );
        assert_eq!(
            enqueue(store.pool(), &target).await.unwrap(),
            EnqueueOutcome::AlreadyExists
        );

        let stats = stats(store.pool()).await.unwrap();
        assert_eq!(stats.total(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_does_not_clobber_state() {
        let store = setup_store().await;
        let target = url("jane-doe");

        enqueue(store.pool(), &target).await.unwrap();
        let claimed = claim_next(store.pool(), 1).await.unwrap();
        assert_eq!(claimed.len(), 1);
        complete(store.pool(), &target, &sample_record("Jane Doe"), 80)
            .await
            .unwrap();

        // Re-discovery must not reset a completed target
        assert_eq!(
            enqueue(store.pool(), &target).await.unwrap(),
            EnqueueOutcome::AlreadyExists
        );
        let row = get(store.pool(), &target).await.unwrap();
        assert_eq!(row.state, TargetState::Completed);
    }

    #[tokio::test]
    async fn test_claim_batch_leaves_remainder_pending() {
        let store = setup_store().await;
        for slug in ["a", "b", "c"] {
            enqueue(store.pool(), &url(slug)).await.unwrap();
        }

        let claimed = claim_next(store.pool(), 2).await.unwrap();
        assert_eq!(claimed.len(), 2);
        for target in &claimed {
            assert_eq!(target.state, TargetState::InProgress);
        }

        let stats = stats(store.pool()).await.unwrap();
        assert_eq!(stats.in_progress, 2);
        assert_eq!(stats.pending, 1);
    }

    #[tokio::test]
    async fn test_claim_respects_discovery_order() {
        let store = setup_store().await;
        enqueue(store.pool(), &url("first")).await.unwrap();
        enqueue(store.pool(), &url("second")).await.unwrap();

        let claimed = claim_next(store.pool(), 10).await.unwrap();
        assert_eq!(claimed.len(), 2);
        assert!(claimed[0].discovered_at <= claimed[1].discovered_at);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_are_disjoint() {
        use std::collections::HashSet;
        use std::sync::Arc;

        // An on-disk pool, so claimers race over real connections instead
        // of the single pinned in-memory one
        let tmp = tempfile::TempDir::new().expect("create temp dir");
        let store = Arc::new(
            WorkStore::open(tmp.path().join("targets.db"))
                .await
                .expect("create test store"),
        );
        store.run_migrations().await.expect("run migrations");

        for i in 0..40 {
            enqueue(store.pool(), &url(&format!("target-{i:02}")))
                .await
                .unwrap();
        }

        let mut claimers = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            claimers.push(tokio::spawn(
                async move { store.claim_next(5).await.expect("claim") },
            ));
        }

        let mut seen = HashSet::new();
        let mut total = 0;
        for claimer in claimers {
            let batch = claimer.await.expect("join claimer");
            total += batch.len();
            for target in batch {
                assert_eq!(target.state, TargetState::InProgress);
                assert!(
                    seen.insert(target.profile_url.as_str().to_string()),
                    "target {} claimed by two callers",
                    target.profile_url
                );
            }
        }

        // Every target claimed exactly once, none left behind
        assert_eq!(total, 40);
        let stats = stats(store.pool()).await.unwrap();
        assert_eq!(stats.in_progress, 40);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn test_claim_empty_queue() {
        let store = setup_store().await;
        let claimed = claim_next(store.pool(), 5).await.unwrap();
        assert!(claimed.is_empty());
    }

    #[tokio::test]
    async fn test_complete_stores_record_and_resets_retries() {
        let store = setup_store().await;
        let target = url("jane-doe");
        enqueue(store.pool(), &target).await.unwrap();

        // Accumulate one failure first
        claim_next(store.pool(), 1).await.unwrap();
        fail(store.pool(), &target, "timeout", 3).await.unwrap();

        claim_next(store.pool(), 1).await.unwrap();
        complete(store.pool(), &target, &sample_record("Jane Doe"), 72)
            .await
            .unwrap();

        let row = get(store.pool(), &target).await.unwrap();
        assert_eq!(row.state, TargetState::Completed);
        assert_eq!(row.retry_count, 0);
        assert!(row.last_error.is_none());

        let records = list_records(store.pool(), 0).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].completeness, 72);
        assert_eq!(records[0].record.name.as_deref(), Some("Jane Doe"));
    }

    #[tokio::test]
    async fn test_complete_requires_in_progress() {
        let store = setup_store().await;
        let target = url("jane-doe");
        enqueue(store.pool(), &target).await.unwrap();

        let before = get(store.pool(), &target).await.unwrap();

        let result = complete(store.pool(), &target, &sample_record("Jane Doe"), 50).await;
        match result {
            Err(StoreError::InvalidStateTransition { from, attempted, .. }) => {
                assert_eq!(from, TargetState::Pending);
                assert_eq!(attempted, TargetState::Completed);
            }
            other => panic!("expected InvalidStateTransition, got {other:?}"),
        }

        // Stored row must be untouched by the rejected operation
        let after = get(store.pool(), &target).await.unwrap();
        assert_eq!(after.state, before.state);
        assert_eq!(after.retry_count, before.retry_count);
        assert_eq!(after.last_error, before.last_error);
        assert_eq!(after.last_attempt_at, before.last_attempt_at);
    }

    #[tokio::test]
    async fn test_complete_unknown_target() {
        let store = setup_store().await;
        let result = complete(store.pool(), &url("ghost"), &sample_record("X Y"), 10).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fail_returns_to_pending_within_budget() {
        let store = setup_store().await;
        let target = url("jane-doe");
        enqueue(store.pool(), &target).await.unwrap();
        claim_next(store.pool(), 1).await.unwrap();

        let state = fail(store.pool(), &target, "navigation timeout", 3)
            .await
            .unwrap();
        assert_eq!(state, TargetState::Pending);

        let row = get(store.pool(), &target).await.unwrap();
        assert_eq!(row.retry_count, 1);
        assert_eq!(row.last_error.as_deref(), Some("navigation timeout"));
    }

    #[tokio::test]
    async fn test_retry_ceiling_is_exact() {
        let store = setup_store().await;
        let target = url("jane-doe");
        enqueue(store.pool(), &target).await.unwrap();

        // Two failures leave the target retryable (retry_count = 2 < 3)
        for _ in 0..2 {
            claim_next(store.pool(), 1).await.unwrap();
            let state = fail(store.pool(), &target, "boom", 3).await.unwrap();
            assert_eq!(state, TargetState::Pending);
        }

        // retry_count = max_retries - 1: the next failure must abandon
        claim_next(store.pool(), 1).await.unwrap();
        let state = fail(store.pool(), &target, "boom", 3).await.unwrap();
        assert_eq!(state, TargetState::Abandoned);

        let row = get(store.pool(), &target).await.unwrap();
        assert_eq!(row.state, TargetState::Abandoned);
        assert_eq!(row.retry_count, 3);

        // Abandoned targets are never claimed again
        let claimed = claim_next(store.pool(), 10).await.unwrap();
        assert!(claimed.is_empty());
    }

    #[tokio::test]
    async fn test_fail_requires_in_progress() {
        let store = setup_store().await;
        let target = url("jane-doe");
        enqueue(store.pool(), &target).await.unwrap();

        let result = fail(store.pool(), &target, "boom", 3).await;
        assert!(matches!(
            result,
            Err(StoreError::InvalidStateTransition {
                from: TargetState::Pending,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_fail_truncates_long_errors() {
        let store = setup_store().await;
        let target = url("jane-doe");
        enqueue(store.pool(), &target).await.unwrap();
        claim_next(store.pool(), 1).await.unwrap();

        let long_error = "x".repeat(2000);
        fail(store.pool(), &target, &long_error, 3).await.unwrap();

        let row = get(store.pool(), &target).await.unwrap();
        assert_eq!(row.last_error.unwrap().len(), 500);
    }

    #[tokio::test]
    async fn test_reopen_preserves_retry_count() {
        let store = setup_store().await;
        let target = url("jane-doe");
        enqueue(store.pool(), &target).await.unwrap();

        // One failure, then a low-quality completion
        claim_next(store.pool(), 1).await.unwrap();
        fail(store.pool(), &target, "boom", 3).await.unwrap();
        claim_next(store.pool(), 1).await.unwrap();
        complete(store.pool(), &target, &sample_record("Jane Doe"), 20)
            .await
            .unwrap();

        // complete() reset the count; fail once more to make it nonzero
        claim_next(store.pool(), 1).await.unwrap();
        fail(store.pool(), &target, "boom", 3).await.unwrap();
        claim_next(store.pool(), 1).await.unwrap();
        complete(store.pool(), &target, &sample_record("Jane Doe"), 20)
            .await
            .unwrap();
        let retry_before = get(store.pool(), &target).await.unwrap().retry_count;

        reopen(store.pool(), &target, "completeness 20 below threshold 40")
            .await
            .unwrap();

        let row = get(store.pool(), &target).await.unwrap();
        assert_eq!(row.state, TargetState::Pending);
        assert_eq!(row.retry_count, retry_before);
    }

    #[tokio::test]
    async fn test_reopen_requires_completed() {
        let store = setup_store().await;
        let target = url("jane-doe");
        enqueue(store.pool(), &target).await.unwrap();

        let result = reopen(store.pool(), &target, "low score").await;
        assert!(matches!(
            result,
            Err(StoreError::InvalidStateTransition {
                from: TargetState::Pending,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_release_preserves_retry_count() {
        let store = setup_store().await;
        let target = url("jane-doe");
        enqueue(store.pool(), &target).await.unwrap();
        claim_next(store.pool(), 1).await.unwrap();
        fail(store.pool(), &target, "boom", 3).await.unwrap();

        claim_next(store.pool(), 1).await.unwrap();
        release(store.pool(), &target).await.unwrap();

        let row = get(store.pool(), &target).await.unwrap();
        assert_eq!(row.state, TargetState::Pending);
        assert_eq!(row.retry_count, 1);
    }

    #[tokio::test]
    async fn test_pause_and_resume_manual() {
        let store = setup_store().await;
        let target = url("jane-doe");
        enqueue(store.pool(), &target).await.unwrap();
        claim_next(store.pool(), 1).await.unwrap();

        pause_manual(store.pool(), &target).await.unwrap();
        let row = get(store.pool(), &target).await.unwrap();
        assert_eq!(row.state, TargetState::NeedsManual);
        // Excluded from retry accounting
        assert_eq!(row.retry_count, 0);

        // Paused targets are not claimable
        assert!(claim_next(store.pool(), 10).await.unwrap().is_empty());

        let resumed = resume_manual(store.pool()).await.unwrap();
        assert_eq!(resumed, 1);
        let row = get(store.pool(), &target).await.unwrap();
        assert_eq!(row.state, TargetState::Pending);
    }

    #[tokio::test]
    async fn test_reclaim_stale_before_new_claims() {
        let store = setup_store().await;
        let target = url("jane-doe");
        enqueue(store.pool(), &target).await.unwrap();
        claim_next(store.pool(), 1).await.unwrap();

        // Simulated crash: the claim is never resolved. On restart the
        // target must be reclaimed before any new claim sees the queue.
        let reclaimed = reclaim_stale(store.pool()).await.unwrap();
        assert_eq!(reclaimed, 1);

        let claimed = claim_next(store.pool(), 10).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].profile_url, target);
    }

    #[tokio::test]
    async fn test_list_records_filters_by_completeness() {
        let store = setup_store().await;
        for (slug, score) in [("high", 90u8), ("low", 25u8)] {
            let target = url(slug);
            enqueue(store.pool(), &target).await.unwrap();
            claim_next(store.pool(), 1).await.unwrap();
            complete(store.pool(), &target, &sample_record("Jane Doe"), score)
                .await
                .unwrap();
        }

        let all = list_records(store.pool(), 0).await.unwrap();
        assert_eq!(all.len(), 2);
        // Best first
        assert_eq!(all[0].completeness, 90);

        let filtered = list_records(store.pool(), 50).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].profile_url, url("high"));
    }

    #[tokio::test]
    async fn test_failed_targets_report() {
        let store = setup_store().await;
        let target = url("jane-doe");
        enqueue(store.pool(), &target).await.unwrap();
        claim_next(store.pool(), 1).await.unwrap();
        fail(store.pool(), &target, "blocked", 3).await.unwrap();

        let failed = failed_targets(store.pool()).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].retry_count, 1);
        assert_eq!(failed[0].last_error.as_deref(), Some("blocked"));
    }

    #[tokio::test]
    async fn test_stats_counts_by_state() {
        let store = setup_store().await;
        for slug in ["a", "b", "c", "d"] {
            enqueue(store.pool(), &url(slug)).await.unwrap();
        }
        claim_next(store.pool(), 2).await.unwrap();
        complete(store.pool(), &url("a"), &sample_record("A B"), 60)
            .await
            .unwrap();

        let stats = stats(store.pool()).await.unwrap();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.total(), 4);
    }
}
