use crate::error::Result;

/// A simulated user interaction, side-effecting only.
///
/// Actions return whether they found something to act on; callers must not
/// treat a `false` as an error.
#[derive(Debug, Clone, PartialEq)]
pub enum InputAction {
    /// Dismiss a known interstitial or modal dialog if one is present
    DismissDialog,
    /// Scroll the page by a pixel delta
    Scroll {
        /// Vertical scroll distance in pixels (negative scrolls up)
        pixels: i64,
    },
    /// Move the pointer to viewport coordinates
    PointerMove {
        /// Horizontal viewport coordinate
        x: f64,
        /// Vertical viewport coordinate
        y: f64,
    },
    /// Expand truncated "see more" sections before extraction
    ExpandSections,
    /// Advance to the next page of search results
    NextPage,
}

/// Narrow navigation capability the scraping stages depend on.
///
/// Everything the pipeline knows about a page comes through this surface:
/// navigation, the visible text, landmark lookup, simulated input, and
/// challenge detection. Stages never see a DOM, so they can be tested
/// against a scripted fake.
#[async_trait::async_trait]
pub trait NavigationCapability: Send + Sync {
    /// Navigate to a URL and wait for the page to settle.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// The full visible text of the current page.
    async fn visible_text(&self) -> Result<String>;

    /// Visible text of the section under a named landmark heading.
    ///
    /// Returns `Ok(None)` when the landmark is absent; absence is valid
    /// data, not an error.
    async fn query_text(&self, landmark: &str) -> Result<Option<String>>;

    /// Perform a simulated interaction; returns whether it took effect.
    async fn simulate_input(&self, action: InputAction) -> Result<bool>;

    /// Whether the current page is a CAPTCHA or verification challenge.
    async fn detect_challenge(&self) -> Result<bool>;
}
