// ABOUTME: Tests for rate-limit header extraction and reset-time resolution.
// ABOUTME: Covers each magnitude band, date formats, and malformed input.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};

use super::feedback::{RateLimitSignals, reset_delay};

/// 2023-11-14T22:13:20Z
fn fixed_now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

#[test]
fn test_small_values_are_relative_seconds() {
    assert_eq!(reset_delay("30", fixed_now()), Some(Duration::from_secs(30)));
    assert_eq!(reset_delay("120", fixed_now()), Some(Duration::from_secs(120)));
    assert_eq!(reset_delay("1.5", fixed_now()), Some(Duration::from_millis(1500)));
}

#[test]
fn test_negative_values_clamp_to_zero() {
    assert_eq!(reset_delay("-5", fixed_now()), Some(Duration::ZERO));
}

#[test]
fn test_mid_range_values_are_seconds() {
    assert_eq!(reset_delay("121", fixed_now()), Some(Duration::from_secs(121)));
    assert_eq!(reset_delay("3600", fixed_now()), Some(Duration::from_secs(3600)));
}

#[test]
fn test_epoch_seconds() {
    assert_eq!(
        reset_delay("1700000045", fixed_now()),
        Some(Duration::from_secs(45))
    );
}

#[test]
fn test_epoch_milliseconds() {
    assert_eq!(
        reset_delay("1700000045000", fixed_now()),
        Some(Duration::from_secs(45))
    );
}

#[test]
fn test_past_epoch_resolves_to_zero() {
    assert_eq!(reset_delay("1699999000", fixed_now()), Some(Duration::ZERO));
    assert_eq!(reset_delay("1699999000000", fixed_now()), Some(Duration::ZERO));
}

#[test]
fn test_rfc2822_date() {
    assert_eq!(
        reset_delay("Tue, 14 Nov 2023 22:14:00 +0000", fixed_now()),
        Some(Duration::from_secs(40))
    );
}

#[test]
fn test_rfc3339_date() {
    assert_eq!(
        reset_delay("2023-11-14T22:13:50Z", fixed_now()),
        Some(Duration::from_secs(30))
    );
}

#[test]
fn test_unparsable_reset_is_none() {
    assert_eq!(reset_delay("soon", fixed_now()), None);
    assert_eq!(reset_delay("", fixed_now()), None);
    assert_eq!(reset_delay("inf", fixed_now()), None);
}

#[test]
fn test_signals_from_hash_map() {
    let headers: HashMap<&str, &str> = HashMap::from([
        ("x-ratelimit-limit", "300"),
        ("x-ratelimit-remaining", "12"),
        ("x-ratelimit-reset", "30"),
    ]);

    let signals = RateLimitSignals::from_headers(&headers);
    assert_eq!(signals.limit, Some(300.0));
    assert_eq!(signals.remaining, Some(12.0));
    assert_eq!(signals.reset.as_deref(), Some("30"));
}

#[test]
fn test_malformed_signals_are_absent() {
    let headers: HashMap<String, String> = HashMap::from([
        ("x-ratelimit-limit".to_string(), "NaN".to_string()),
        ("x-ratelimit-remaining".to_string(), "abc".to_string()),
        ("x-ratelimit-reset".to_string(), "   ".to_string()),
    ]);

    assert_eq!(
        RateLimitSignals::from_headers(&headers),
        RateLimitSignals::default()
    );
}

#[test]
fn test_header_names_are_case_sensitive_for_maps() {
    let headers: HashMap<&str, &str> = HashMap::from([("X-RateLimit-Limit", "300")]);
    assert_eq!(RateLimitSignals::from_headers(&headers).limit, None);
}

#[test]
fn test_signals_from_reqwest_headers() {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-limit", HeaderValue::from_static("60"));
    headers.insert("x-ratelimit-remaining", HeaderValue::from_static("3"));

    let signals = RateLimitSignals::from_headers(&headers);
    assert_eq!(signals.limit, Some(60.0));
    assert_eq!(signals.remaining, Some(3.0));
    assert!(signals.reset.is_none());
}
