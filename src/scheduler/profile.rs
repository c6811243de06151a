// ABOUTME: Limit profiles for the per-second and per-minute quota windows.
// ABOUTME: Maps a server-reported ceiling onto a known caller class, minus margins.

use serde::{Deserialize, Serialize};

/// Reported minute ceilings at or above this select the authenticated profile.
pub const ELEVATED_LIMIT_THRESHOLD: f64 = 200.0;

/// Ceilings for the two quota windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitProfile {
    /// Maximum admissions within any trailing second.
    pub per_second: u32,
    /// Maximum admissions within any trailing minute.
    pub per_minute: u32,
}

impl LimitProfile {
    /// Documented limits for callers presenting a token.
    pub const AUTHENTICATED: LimitProfile = LimitProfile {
        per_second: 44,
        per_minute: 298,
    };

    /// Documented limits for anonymous callers.
    pub const ANONYMOUS: LimitProfile = LimitProfile {
        per_second: 14,
        per_minute: 58,
    };

    /// Amount kept in reserve below the server's true limit.
    pub const SAFETY_MARGIN: LimitProfile = LimitProfile {
        per_second: 1,
        per_minute: 2,
    };

    /// Create a profile from explicit ceilings.
    pub const fn new(per_second: u32, per_minute: u32) -> Self {
        Self {
            per_second,
            per_minute,
        }
    }

    /// Pick the known profile matching a server-reported minute ceiling.
    pub fn for_reported_limit(reported: f64) -> LimitProfile {
        if reported >= ELEVATED_LIMIT_THRESHOLD {
            Self::AUTHENTICATED
        } else {
            Self::ANONYMOUS
        }
    }

    /// Local ceilings to run with after the server reports `reported` per minute.
    ///
    /// The per-minute ceiling stays strictly under the server's. When the
    /// margin leaves no room it is 0, meaning "keep the current ceiling".
    /// The per-second ceiling is floored at 1.
    pub fn retuned_for(reported: f64) -> LimitProfile {
        let profile = Self::for_reported_limit(reported);
        let margin = Self::SAFETY_MARGIN;

        // Saturating cast: f64 -> u32 clamps, NaN never reaches here.
        let reported_minute = reported.floor() as u32;
        let per_minute = profile.per_minute.min(reported_minute);

        LimitProfile {
            per_second: profile.per_second.saturating_sub(margin.per_second).max(1),
            per_minute: per_minute.saturating_sub(margin.per_minute),
        }
    }
}

impl Default for LimitProfile {
    fn default() -> Self {
        Self::ANONYMOUS
    }
}
