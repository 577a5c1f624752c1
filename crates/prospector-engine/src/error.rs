use prospector_browser::BrowserError;
use prospector_store::StoreError;
use thiserror::Error;

/// Pipeline error taxonomy.
///
/// The distinction that matters here is scope: `TransientNavigation` and
/// `ExtractionUnreadable` are per-target and counted against the retry
/// budget; `Blocked` halts the whole session; `ManualInterventionRequired`
/// pauses the target outside retry accounting and waits for a human.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Retryable per-target failure, counted against the retry budget.
    #[error("transient navigation failure: {0}")]
    TransientNavigation(String),

    /// The source is refusing the whole session; halt instead of burning retries.
    #[error("session blocked: {0}")]
    Blocked(String),

    /// A challenge the system cannot resolve itself (CAPTCHA).
    #[error("manual intervention required: {0}")]
    ManualInterventionRequired(String),

    /// The page surface could not be read at all.
    #[error("page surface unreadable: {0}")]
    ExtractionUnreadable(String),

    /// Work store failure, including state-machine violations.
    #[error("work store error: {0}")]
    Store(#[from] StoreError),

    /// Browser infrastructure failure (launch, script injection).
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),
}

impl EngineError {
    /// Map a per-navigation browser failure into the retryable bucket.
    ///
    /// Launch-time failures go through `Browser` instead; only failures
    /// tied to a specific target belong here.
    #[must_use]
    pub fn transient(err: &BrowserError) -> Self {
        Self::TransientNavigation(err.to_string())
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let browser_err = BrowserError::Timeout("navigate to https://example.com".to_string());
        let err = EngineError::transient(&browser_err);
        assert!(matches!(err, EngineError::TransientNavigation(_)));
        assert!(err.to_string().contains("example.com"));
    }

    #[test]
    fn test_store_error_propagates() {
        let store_err = StoreError::NotFound("https://example.com/in/jane".to_string());
        let err: EngineError = store_err.into();
        assert!(matches!(err, EngineError::Store(_)));
    }
}
