/// One browser fingerprint: user agent, viewport, locale, and timezone.
///
/// Profiles come from a fixed catalog of combinations observed on real
/// desktop browsers; mixing a user agent with a mismatched platform
/// timezone is itself a detection signal, so the catalog pairs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintProfile {
    pub user_agent: &'static str,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub locale: &'static str,
    pub timezone: &'static str,
}

/// Fixed catalog of plausible desktop fingerprints.
pub const CATALOG: &[FingerprintProfile] = &[
    FingerprintProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        viewport_width: 1920,
        viewport_height: 1080,
        locale: "en-US",
        timezone: "America/New_York",
    },
    FingerprintProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
        viewport_width: 1366,
        viewport_height: 768,
        locale: "en-US",
        timezone: "America/Chicago",
    },
    FingerprintProfile {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        viewport_width: 1440,
        viewport_height: 900,
        locale: "en-US",
        timezone: "America/Los_Angeles",
    },
    FingerprintProfile {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
        viewport_width: 1536,
        viewport_height: 864,
        locale: "en-GB",
        timezone: "Europe/London",
    },
    FingerprintProfile {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        viewport_width: 1920,
        viewport_height: 1080,
        locale: "en-US",
        timezone: "America/Denver",
    },
];
