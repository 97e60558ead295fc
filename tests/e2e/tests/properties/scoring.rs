//! Property suite for temperature and stability scoring

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use wheeler_core::{compute_temperature, tier_for, PatternMetrics, Tier};

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

proptest! {
    /// Temperature is always in [0, 1], for any hit count and any gap.
    #[test]
    fn temperature_bounded(hits in 0u64..100_000, gap_minutes in 0i64..(365 * 24 * 60)) {
        let temp = compute_temperature(hits, t0(), t0() + Duration::minutes(gap_minutes));
        prop_assert!((0.0..=1.0).contains(&temp), "temperature out of range: {}", temp);
    }

    /// More hits never cool an entry down (same recency).
    #[test]
    fn temperature_monotonic_in_hits(hits in 0u64..1000, gap_days in 0i64..60) {
        let now = t0() + Duration::days(gap_days);
        let cooler = compute_temperature(hits, t0(), now);
        let warmer = compute_temperature(hits + 1, t0(), now);
        prop_assert!(warmer >= cooler);
    }

    /// A longer idle gap never heats an entry up (same hits).
    #[test]
    fn temperature_monotonic_in_idleness(hits in 0u64..1000, gap_hours in 0i64..1000) {
        let recent = compute_temperature(hits, t0(), t0() + Duration::hours(gap_hours));
        let stale = compute_temperature(hits, t0(), t0() + Duration::hours(gap_hours + 24));
        prop_assert!(stale <= recent);
    }

    /// Tier classification is total and consistent with the cutoffs.
    #[test]
    fn tier_respects_cutoffs(temp in 0.0f64..=1.0) {
        match tier_for(temp) {
            Tier::Hot => prop_assert!(temp >= 0.6),
            Tier::Warm => prop_assert!((0.3..0.6).contains(&temp)),
            Tier::Cold => prop_assert!(temp < 0.3),
        }
    }

    /// Stability scores are in [0, 1] for every combination of counters,
    /// including the degenerate pre-switch shapes.
    #[test]
    fn stability_bounded(
        hits in 0u64..1_000_000,
        persistence in 0u64..10_000,
        switches in 0u64..10_000,
        survived in any::<bool>(),
    ) {
        let metrics = PatternMetrics {
            pattern_id: "p".to_string(),
            text_preview: String::new(),
            hit_count: hits,
            frame_persistence: persistence,
            context_switches_seen: switches,
            compression_survived: survived,
            first_seen: t0(),
            last_accessed: t0(),
        };
        let score = metrics.stability_score();
        prop_assert!((0.0..=1.0).contains(&score), "score out of range: {}", score);
    }

    /// Compression survival never lowers a score.
    #[test]
    fn compression_only_helps(
        hits in 0u64..10_000,
        persistence in 0u64..100,
        switches in 0u64..100,
    ) {
        let base = PatternMetrics {
            pattern_id: "p".to_string(),
            text_preview: String::new(),
            hit_count: hits,
            frame_persistence: persistence,
            context_switches_seen: switches,
            compression_survived: false,
            first_seen: t0(),
            last_accessed: t0(),
        };
        let survived = PatternMetrics {
            compression_survived: true,
            ..base.clone()
        };
        prop_assert!(survived.stability_score() >= base.stability_score());
    }
}
