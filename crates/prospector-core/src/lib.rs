//! Prospector Core
//!
//! Shared types and configuration used across the Prospector workspace.
//!
//! # Architecture
//!
//! - **Types**: newtypes and state machine enums for the work queue domain
//! - **Records**: the structured profile payload produced by extraction
//! - **Configuration**: TOML configuration with XDG paths and env overrides
//!
//! # Design Principles
//!
//! - State transitions are validated centrally in [`types::TargetState`];
//!   consumers never mutate state strings directly
//! - Profile URLs are validated at the boundary via [`types::ProfileUrl`]
//! - No I/O in this crate beyond configuration file access

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod record;
pub mod types;

pub use config::AppConfig;
pub use error::{ConfigError, ConfigResult, CoreError, Result};
pub use record::ProfileRecord;
pub use types::{ProfileUrl, TargetState};
