//! Prospector Work Store
//!
//! Durable `SQLite`-backed work queue and record store. The store is the
//! single source of truth for discovered targets: their queue state, retry
//! accounting, and extracted records all live in one `targets` table, so a
//! session can crash at any point and resume without losing or duplicating
//! work.
//!
//! # Architecture
//!
//! - **State machine**: every mutation is guarded by the target state
//!   machine; illegal transitions fail loudly and leave the row untouched
//! - **Atomic claims**: batch claims happen in a single `UPDATE` statement,
//!   so concurrent claimers never receive the same target
//! - **Migrations**: SQL migrations are embedded and versioned using `SQLx`
//!
//! # Example
//!
//! ```ignore
//! use prospector_store::WorkStore;
//!
//! let store = WorkStore::open("prospector.db").await?;
//! store.run_migrations().await?;
//! store.enqueue(&url).await?;
//! let batch = store.claim_next(10).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod connection;
pub mod error;
pub mod migrations;
/// Target queue state machine operations.
pub mod targets;

// Re-export commonly used types
pub use connection::StorePool;
pub use error::{Result, StoreError};
pub use targets::{EnqueueOutcome, FailedTarget, StoreStats, StoredRecord, Target};

use prospector_core::record::ProfileRecord;
use prospector_core::{ProfileUrl, TargetState};
use std::path::Path;

/// High-level work store interface.
///
/// A convenient wrapper around [`StorePool`] and the functions in
/// [`targets`], for callers that don't need direct pool access.
#[derive(Debug)]
pub struct WorkStore {
    pool: StorePool,
}

impl WorkStore {
    /// Open (or create) the work store at the given path.
    ///
    /// # Arguments
    /// * `path` - Path to the database file (or `:memory:` for in-memory)
    ///
    /// # Errors
    /// Returns `StoreError::Open` if the database cannot be opened.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let pool = StorePool::new(path).await?;
        Ok(Self { pool })
    }

    /// Run all pending migrations.
    ///
    /// Call once after opening, before any queue operation.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(self.pool.pool()).await
    }

    /// Get the current schema version (number of applied migrations).
    pub async fn schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(self.pool.pool()).await
    }

    /// Get a reference to the underlying `SQLx` pool.
    #[must_use]
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Sqlite> {
        self.pool.pool()
    }

    /// Idempotently insert a discovered target in `pending` state.
    pub async fn enqueue(&self, url: &ProfileUrl) -> Result<EnqueueOutcome> {
        targets::enqueue(self.pool(), url).await
    }

    /// Atomically claim up to `batch_size` pending targets.
    pub async fn claim_next(&self, batch_size: u32) -> Result<Vec<Target>> {
        targets::claim_next(self.pool(), batch_size).await
    }

    /// Store a record for an `in_progress` target and mark it `completed`.
    pub async fn complete(
        &self,
        url: &ProfileUrl,
        record: &ProfileRecord,
        completeness: u8,
    ) -> Result<()> {
        targets::complete(self.pool(), url, record, completeness).await
    }

    /// Record a failed attempt; returns the resulting state.
    pub async fn fail(
        &self,
        url: &ProfileUrl,
        error: &str,
        max_retries: u32,
    ) -> Result<TargetState> {
        targets::fail(self.pool(), url, error, max_retries).await
    }

    /// Validation-triggered reopen: `completed -> pending`.
    pub async fn reopen(&self, url: &ProfileUrl, reason: &str) -> Result<()> {
        targets::reopen(self.pool(), url, reason).await
    }

    /// Cancellation rollback: `in_progress -> pending`.
    pub async fn release(&self, url: &ProfileUrl) -> Result<()> {
        targets::release(self.pool(), url).await
    }

    /// Pause an `in_progress` target awaiting manual intervention.
    pub async fn pause_manual(&self, url: &ProfileUrl) -> Result<()> {
        targets::pause_manual(self.pool(), url).await
    }

    /// Return all manually-paused targets to `pending`.
    pub async fn resume_manual(&self) -> Result<u64> {
        targets::resume_manual(self.pool()).await
    }

    /// Reclaim targets left `in_progress` by a crashed session.
    pub async fn reclaim_stale(&self) -> Result<u64> {
        targets::reclaim_stale(self.pool()).await
    }

    /// Fetch a single target by identifier.
    pub async fn get(&self, url: &ProfileUrl) -> Result<Target> {
        targets::get(self.pool(), url).await
    }

    /// Per-state row counts.
    pub async fn stats(&self) -> Result<StoreStats> {
        targets::stats(self.pool()).await
    }

    /// All completed records at or above a completeness floor, best first.
    pub async fn list_records(&self, min_completeness: u8) -> Result<Vec<StoredRecord>> {
        targets::list_records(self.pool(), min_completeness).await
    }

    /// Targets that have recorded at least one failure.
    pub async fn failed_targets(&self) -> Result<Vec<FailedTarget>> {
        targets::failed_targets(self.pool()).await
    }

    /// Close the store gracefully.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_open_and_migrate() {
        let store = WorkStore::open(":memory:").await.expect("open store");
        store.run_migrations().await.expect("run migrations");

        let version = store.schema_version().await.expect("get version");
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn test_store_schema() {
        let store = WorkStore::open(":memory:").await.expect("open store");
        store.run_migrations().await.expect("run migrations");

        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info('targets') ORDER BY cid")
                .fetch_all(store.pool())
                .await
                .expect("query columns");

        assert_eq!(
            columns,
            vec![
                "profile_url",
                "state",
                "retry_count",
                "last_error",
                "record_blob",
                "completeness_score",
                "discovered_at",
                "last_attempt_at"
            ]
        );
    }

    #[tokio::test]
    async fn test_store_close() {
        let store = WorkStore::open(":memory:").await.expect("open store");
        store.close().await; // Should not panic
    }
}
