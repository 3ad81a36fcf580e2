//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{TtlPolicy, TtlTier, MAX_TTL};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Seconds between scheduled warmups
    pub warmup_interval: u64,
    /// Minimum seconds between two warmup starts
    pub warmup_cooldown: u64,
    pub ttl_short: u64,
    pub ttl_medium: u64,
    pub ttl_long: u64,
    pub ttl_very_long: u64,
    pub ttl_pricing: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// Unset, unparseable, or zero values fall back to the default. TTLs
    /// above [`MAX_TTL`] are clamped to it.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 60)
    /// - `WARMUP_INTERVAL` - Warmup frequency in seconds (default: 1800)
    /// - `WARMUP_COOLDOWN` - Minimum gap between warmups in seconds (default: 60)
    /// - `TTL_SHORT`, `TTL_MEDIUM`, `TTL_LONG`, `TTL_VERY_LONG`, `TTL_PRICING` -
    ///   tier durations in seconds (defaults: 60, 300, 900, 3600, 86400)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            warmup_interval: env_or("WARMUP_INTERVAL", defaults.warmup_interval),
            warmup_cooldown: env_or("WARMUP_COOLDOWN", defaults.warmup_cooldown),
            ttl_short: ttl_env("TTL_SHORT", defaults.ttl_short),
            ttl_medium: ttl_env("TTL_MEDIUM", defaults.ttl_medium),
            ttl_long: ttl_env("TTL_LONG", defaults.ttl_long),
            ttl_very_long: ttl_env("TTL_VERY_LONG", defaults.ttl_very_long),
            ttl_pricing: ttl_env("TTL_PRICING", defaults.ttl_pricing),
        }
    }

    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy {
            short: Duration::from_secs(self.ttl_short),
            medium: Duration::from_secs(self.ttl_medium),
            long: Duration::from_secs(self.ttl_long),
            very_long: Duration::from_secs(self.ttl_very_long),
            pricing: Duration::from_secs(self.ttl_pricing),
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }

    pub fn warmup_interval(&self) -> Duration {
        Duration::from_secs(self.warmup_interval)
    }

    pub fn warmup_cooldown(&self) -> Duration {
        Duration::from_secs(self.warmup_cooldown)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cleanup_interval: 60,
            warmup_interval: 1800,
            warmup_cooldown: 60,
            ttl_short: TtlTier::Short.default_secs(),
            ttl_medium: TtlTier::Medium.default_secs(),
            ttl_long: TtlTier::Long.default_secs(),
            ttl_very_long: TtlTier::VeryLong.default_secs(),
            ttl_pricing: TtlTier::Pricing.default_secs(),
        }
    }
}

fn ttl_env(name: &str, default: u64) -> u64 {
    env_or(name, default).min(MAX_TTL.as_secs())
}

fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr + PartialEq + Default,
{
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .filter(|v| *v != T::default())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 60);
        assert_eq!(config.warmup_interval, 1800);
        assert_eq!(config.warmup_cooldown, 60);
        assert_eq!(config.ttl_pricing, 86400);
    }

    #[test]
    fn test_default_policy_matches_tiers() {
        let policy = Config::default().ttl_policy();
        assert_eq!(policy, TtlPolicy::default());
        assert_eq!(policy.ttl(TtlTier::Long), Duration::from_secs(900));
    }

    // All env manipulation lives in one test so parallel tests never race on it.
    #[test]
    fn test_config_from_env() {
        for name in [
            "SERVER_PORT",
            "CLEANUP_INTERVAL",
            "WARMUP_INTERVAL",
            "WARMUP_COOLDOWN",
            "TTL_SHORT",
            "TTL_MEDIUM",
            "TTL_LONG",
            "TTL_VERY_LONG",
            "TTL_PRICING",
        ] {
            env::remove_var(name);
        }
        assert_eq!(Config::from_env(), Config::default());

        env::set_var("TTL_SHORT", "5");
        env::set_var("TTL_MEDIUM", "0");
        env::set_var("TTL_LONG", "ten");
        env::set_var("SERVER_PORT", "8080");

        let config = Config::from_env();
        assert_eq!(config.ttl_short, 5);
        assert_eq!(config.ttl_medium, 300, "Zero falls back to the default");
        assert_eq!(config.ttl_long, 900, "Garbage falls back to the default");
        assert_eq!(config.server_port, 8080);

        env::set_var("TTL_PRICING", u64::MAX.to_string());
        let policy = Config::from_env().ttl_policy();
        assert_eq!(policy.pricing, MAX_TTL);

        for name in ["TTL_SHORT", "TTL_MEDIUM", "TTL_LONG", "TTL_PRICING", "SERVER_PORT"] {
            env::remove_var(name);
        }
    }
}
