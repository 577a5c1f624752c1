//! Prospector Engine - scraping pipeline orchestration.
//!
//! Coordinates the search, scrape, and validation stages against the
//! durable work store, with retry accounting, block/challenge
//! classification, and session budgets. All stages talk to pages through
//! the narrow navigation capability, so the whole pipeline runs unchanged
//! against a scripted fake in tests.
//!
//! # Features
//!
//! - Target discovery by text-pattern matching, from query searches or the
//!   account's own connections list
//! - Per-target retry budget with distinct handling for blocks and
//!   CAPTCHA challenges (halt and pause respectively, never burned retries)
//! - Landmark-based extraction that degrades gracefully under markup change
//! - Validation sweeps that reopen low-quality records
//! - Resumable sessions: all progress lives in the work store
//!
//! # Example
//!
//! ```rust,ignore
//! use prospector_engine::{Orchestrator, OrchestratorConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let orchestrator = Orchestrator::new(&session, &store, &policy, config);
//! let report = orchestrator.run_session(&CancellationToken::new()).await?;
//! println!("session ended: {}", report.halt_reason);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod connections;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod scrape;
pub mod search;
pub mod validate;

// Re-export commonly used types
pub use connections::ConnectionsStage;
pub use error::{EngineError, Result};
pub use extract::{completeness, extract, CompletenessWeights};
pub use orchestrator::{HaltReason, Orchestrator, OrchestratorConfig, SessionReport};
pub use scrape::{BatchReport, ScrapeStage, TargetOutcome};
pub use search::SearchStage;
pub use validate::{ValidationReport, ValidationStage};
