//! Browser automation layer for Prospector.
//!
//! Exposes the narrow [`NavigationCapability`] trait the scraping stages
//! depend on, a Chromium implementation with anti-fingerprinting, and the
//! [`BehaviorPolicy`] that paces every unit of work.

pub mod capability;
pub mod error;
pub mod fingerprint;
pub mod policy;
pub mod session;

pub use capability::{InputAction, NavigationCapability};
pub use error::{BrowserError, Result};
pub use fingerprint::{FingerprintProfile, CATALOG};
pub use policy::BehaviorPolicy;
pub use session::{ChromiumSession, SessionOptions};
