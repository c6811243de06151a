// ABOUTME: Extracts rate-limit signals from response headers.
// ABOUTME: Resolves the server's reset hint into a delay using magnitude heuristics.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Header carrying the server's per-minute ceiling.
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";

/// Header carrying calls remaining before the server's window resets.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Header carrying the reset time, as a number or a date.
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Numeric resets up to this many are relative seconds.
const RELATIVE_SECONDS_MAX: f64 = 120.0;

/// Numeric resets above this are absolute epoch milliseconds.
const EPOCH_MILLIS_MIN: f64 = 1_000_000_000_000.0;

/// Numeric resets above this (and below millis) are absolute epoch seconds.
const EPOCH_SECONDS_MIN: f64 = 1_000_000_000.0;

/// Read-only access to response headers by name.
pub trait HeaderSource {
    /// Returns the header's value, if present and valid UTF-8.
    fn header(&self, name: &str) -> Option<&str>;
}

impl HeaderSource for reqwest::header::HeaderMap {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|value| value.to_str().ok())
    }
}

impl HeaderSource for HashMap<String, String> {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl HeaderSource for HashMap<&str, &str> {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name).copied()
    }
}

impl HeaderSource for BTreeMap<String, String> {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// Rate-limit metadata from one response. Absent or malformed values are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateLimitSignals {
    /// Server-reported ceiling for its minute window.
    pub limit: Option<f64>,
    /// Calls remaining before the server resets.
    pub remaining: Option<f64>,
    /// Raw reset hint, left unparsed until a cooldown is needed.
    pub reset: Option<String>,
}

impl RateLimitSignals {
    /// Collect the rate-limit headers from a response.
    pub fn from_headers<H: HeaderSource + ?Sized>(headers: &H) -> Self {
        Self {
            limit: parse_number(headers.header(LIMIT_HEADER)),
            remaining: parse_number(headers.header(REMAINING_HEADER)),
            reset: headers
                .header(RESET_HEADER)
                .filter(|raw| !raw.trim().is_empty())
                .map(str::to_owned),
        }
    }
}

/// Parse a finite number; empty, non-numeric and infinite values are absent.
fn parse_number(raw: Option<&str>) -> Option<f64> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Resolve a reset hint into a delay from `now`.
///
/// The order of checks matters: small numbers are relative seconds, very
/// large ones epoch milliseconds, large ones epoch seconds, and anything
/// else numeric is treated as seconds. Non-numeric input is parsed as an
/// RFC 2822 or RFC 3339 date. Resets in the past resolve to zero. Returns
/// `None` when the hint is empty, unparsable or out of range.
pub fn reset_delay(raw: &str, now: DateTime<Utc>) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let now_ms = now.timestamp_millis() as f64;

    let delay_ms = match parse_number(Some(raw)) {
        Some(n) if n <= RELATIVE_SECONDS_MAX => n * 1000.0,
        Some(n) if n > EPOCH_MILLIS_MIN => n - now_ms,
        Some(n) if n > EPOCH_SECONDS_MIN => n * 1000.0 - now_ms,
        Some(n) => n * 1000.0,
        None => {
            let at = DateTime::parse_from_rfc2822(raw)
                .or_else(|_| DateTime::parse_from_rfc3339(raw))
                .ok()?;
            (at.timestamp_millis() as f64) - now_ms
        }
    };

    // Out-of-range resets are treated like unparsable ones.
    Duration::try_from_secs_f64(delay_ms.max(0.0) / 1000.0).ok()
}
