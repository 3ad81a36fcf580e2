//! TTL tiers
//!
//! Staleness budgets per class of data. These are policy; the cache itself
//! accepts any positive duration.

use std::time::Duration;

use serde::Serialize;

/// Class of data, from frequently mutated listings to pricing tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlTier {
    /// Listings that change with every pipeline move
    Short,
    /// Detail views
    Medium,
    /// Reference content such as knowledge-base articles
    Long,
    VeryLong,
    /// Pricing rows, updated on an operational cadence
    Pricing,
}

impl TtlTier {
    pub const ALL: [TtlTier; 5] = [
        TtlTier::Short,
        TtlTier::Medium,
        TtlTier::Long,
        TtlTier::VeryLong,
        TtlTier::Pricing,
    ];

    /// Built-in duration in seconds.
    pub const fn default_secs(self) -> u64 {
        match self {
            TtlTier::Short => 60,
            TtlTier::Medium => 300,
            TtlTier::Long => 900,
            TtlTier::VeryLong => 3600,
            TtlTier::Pricing => 86_400,
        }
    }
}

/// Longest lifetime an entry can be given. Longer TTLs are clamped to it.
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

// == TTL Policy ==
/// Concrete duration for every tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub short: Duration,
    pub medium: Duration,
    pub long: Duration,
    pub very_long: Duration,
    pub pricing: Duration,
}

impl TtlPolicy {
    pub fn ttl(&self, tier: TtlTier) -> Duration {
        match tier {
            TtlTier::Short => self.short,
            TtlTier::Medium => self.medium,
            TtlTier::Long => self.long,
            TtlTier::VeryLong => self.very_long,
            TtlTier::Pricing => self.pricing,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        let secs = |tier: TtlTier| Duration::from_secs(tier.default_secs());
        Self {
            short: secs(TtlTier::Short),
            medium: secs(TtlTier::Medium),
            long: secs(TtlTier::Long),
            very_long: secs(TtlTier::VeryLong),
            pricing: secs(TtlTier::Pricing),
        }
    }
}
