// ABOUTME: Scheduler configuration - initial ceilings and feedback tuning knobs.
// ABOUTME: Loadable via serde or assembled with SchedulerConfigBuilder.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;
use crate::scheduler::LimitProfile;

/// Default padding added to every server-derived cooldown.
pub const DEFAULT_COOLDOWN_PADDING_MS: u64 = 800;

/// Default remaining-count at or below which the reset hint is honored.
pub const DEFAULT_REMAINING_THRESHOLD: u32 = 4;

/// Default floor on quota waits, so the drain loop never busy-spins.
pub const DEFAULT_MIN_WAIT_MS: u64 = 10;

/// Configuration for a [`Scheduler`](crate::scheduler::Scheduler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Ceilings in effect before any server feedback arrives.
    pub initial_limits: LimitProfile,
    /// Added to every cooldown derived from a reset header.
    pub cooldown_padding_ms: u64,
    /// Cooldowns are only derived once remaining calls drop to this.
    pub remaining_threshold: u32,
    /// Floor on the sleep taken when both windows are saturated.
    pub min_wait_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_limits: LimitProfile::ANONYMOUS,
            cooldown_padding_ms: DEFAULT_COOLDOWN_PADDING_MS,
            remaining_threshold: DEFAULT_REMAINING_THRESHOLD,
            min_wait_ms: DEFAULT_MIN_WAIT_MS,
        }
    }
}

impl SchedulerConfig {
    /// Create a new config builder.
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::new()
    }

    /// Check that every ceiling admits at least one call.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.initial_limits.per_second == 0 {
            return Err(SchedulerError::InvalidConfig(
                "per_second ceiling must be at least 1".into(),
            ));
        }
        if self.initial_limits.per_minute == 0 {
            return Err(SchedulerError::InvalidConfig(
                "per_minute ceiling must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn cooldown_padding(&self) -> Duration {
        Duration::from_millis(self.cooldown_padding_ms)
    }

    pub fn min_wait(&self) -> Duration {
        Duration::from_millis(self.min_wait_ms)
    }
}

/// Builder for constructing scheduler configs.
#[derive(Debug, Default)]
pub struct SchedulerConfigBuilder {
    config: SchedulerConfig,
}

impl SchedulerConfigBuilder {
    /// Create a new builder seeded with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ceilings used before any feedback arrives.
    pub fn initial_limits(mut self, limits: LimitProfile) -> Self {
        self.config.initial_limits = limits;
        self
    }

    /// Set the padding added to server-derived cooldowns.
    pub fn cooldown_padding(mut self, padding: Duration) -> Self {
        self.config.cooldown_padding_ms = padding.as_millis() as u64;
        self
    }

    /// Set the remaining-count threshold that triggers a cooldown.
    pub fn remaining_threshold(mut self, threshold: u32) -> Self {
        self.config.remaining_threshold = threshold;
        self
    }

    /// Set the minimum quota wait.
    pub fn min_wait(mut self, wait: Duration) -> Self {
        self.config.min_wait_ms = wait.as_millis() as u64;
        self
    }

    /// Build and validate the config.
    pub fn build(self) -> Result<SchedulerConfig, SchedulerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_anonymous_profile() {
        let config = SchedulerConfig::default();
        assert_eq!(config.initial_limits, LimitProfile::new(14, 58));
        assert_eq!(config.cooldown_padding(), Duration::from_millis(800));
        assert_eq!(config.remaining_threshold, 4);
        assert_eq!(config.min_wait(), Duration::from_millis(10));
    }

    #[test]
    fn test_builder_overrides() {
        let config = SchedulerConfig::builder()
            .initial_limits(LimitProfile::AUTHENTICATED)
            .cooldown_padding(Duration::from_millis(250))
            .build()
            .unwrap();
        assert_eq!(config.initial_limits, LimitProfile::AUTHENTICATED);
        assert_eq!(config.cooldown_padding_ms, 250);
        assert_eq!(config.remaining_threshold, 4);
    }

    #[test]
    fn test_builder_rejects_zero_ceiling() {
        let result = SchedulerConfig::builder()
            .initial_limits(LimitProfile::new(0, 10))
            .build();
        assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: SchedulerConfig = serde_json::from_value(serde_json::json!({
            "initial_limits": { "per_second": 5, "per_minute": 30 }
        }))
        .unwrap();
        assert_eq!(config.initial_limits, LimitProfile::new(5, 30));
        assert_eq!(config.cooldown_padding_ms, DEFAULT_COOLDOWN_PADDING_MS);
    }
}
