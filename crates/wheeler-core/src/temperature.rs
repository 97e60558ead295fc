//! Access temperature - pure computation, no I/O
//!
//! Memories carry a temperature reflecting how recently and frequently they
//! are recalled:
//!
//! ```text
//! temp  = base_from_hits * decay_from_time
//! base  = min(1.0, 0.3 + 0.7 * hit_count / HIT_SATURATION)
//! decay = 2 ^ (-days_since_last_access / HALF_LIFE_DAYS)
//! ```
//!
//! Tiers: hot >= 0.6, warm >= 0.3, cold below. The storage layer calls this
//! when returning recall results and when listing memories; every function
//! takes an explicit `now` so tests can pin the clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Days for temperature to halve without access.
pub const HALF_LIFE_DAYS: f64 = 7.0;

/// Hits at which the base saturates at 1.0.
pub const HIT_SATURATION: f64 = 10.0;

/// Hot tier floor.
pub const TIER_HOT: f64 = 0.6;

/// Warm tier floor.
pub const TIER_WARM: f64 = 0.3;

// ============================================================================
// TIERS
// ============================================================================

/// Temperature tier classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Frequently and recently accessed.
    Hot,
    /// Moderately accessed, or fresh with no recalls yet.
    Warm,
    /// Rarely accessed or decayed.
    Cold,
}

impl Tier {
    /// Wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Hot => "hot",
            Tier::Warm => "warm",
            Tier::Cold => "cold",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// COMPUTATION
// ============================================================================

/// Temperature in [0, 1] from access count and recency.
///
/// Rounded to 4 decimal places. A fresh entry recalled seconds after being
/// stored would otherwise sit a float-noise hair below the warm boundary;
/// the round keeps tier classification stable at exactly 0.3.
pub fn compute_temperature(hit_count: u64, last_accessed: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let elapsed = now.signed_duration_since(last_accessed);
    let days_since = (elapsed.num_milliseconds() as f64 / 86_400_000.0).max(0.0);

    let base = (0.3 + 0.7 * hit_count as f64 / HIT_SATURATION).min(1.0);
    let decay = 2.0f64.powf(-days_since / HALF_LIFE_DAYS);

    round4(base * decay)
}

/// Classify a temperature into its tier.
pub fn tier_for(temp: f64) -> Tier {
    if temp >= TIER_HOT {
        Tier::Hot
    } else if temp >= TIER_WARM {
        Tier::Warm
    } else {
        Tier::Cold
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

// ============================================================================
// TESTS
// ============================================================================
