//! Stability journey - pattern metrics across recalls and context switches

use chrono::{DateTime, Duration, Utc};
use wheeler_e2e_tests::harness::scratch_engine;
use wheeler_core::{RecallOptions, StabilityTracker};

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

#[test]
fn recall_records_hits_and_attaches_scores() {
    let (_root, engine) = scratch_engine();
    engine.store("a pattern that will be recalled", None).unwrap();

    let first = engine
        .recall(
            "a pattern that will be recalled",
            &RecallOptions {
                top_k: 1,
                ..Default::default()
            },
        )
        .unwrap();
    let second = engine
        .recall(
            "a pattern that will be recalled",
            &RecallOptions {
                top_k: 1,
                ..Default::default()
            },
        )
        .unwrap();

    assert!(first[0].stability > 0.0);
    assert!(second[0].stability > first[0].stability);

    let report = engine.stability_report();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].hit_count, 2);
    assert_eq!(report[0].text_preview, "a pattern that will be recalled");
}

#[test]
fn stability_file_survives_engine_restart() {
    let (root, engine) = scratch_engine();
    engine.store("persisted pattern", None).unwrap();
    engine
        .recall("persisted pattern", &RecallOptions::default())
        .unwrap();
    let before = engine.stability_report();
    drop(engine);

    assert!(root.path().join("stability_metrics.json").exists());
    let reloaded = StabilityTracker::load(root.path().join("stability_metrics.json"));
    assert_eq!(reloaded.len(), before.len());
    assert_eq!(
        reloaded.all_scored()[0].stability_score,
        before[0].stability_score
    );
}

#[test]
fn compression_survival_lifts_the_score() {
    let (_root, engine) = scratch_engine();
    engine.store("pattern facing compression", None).unwrap();
    let recalled = engine
        .recall("pattern facing compression", &RecallOptions::default())
        .unwrap();
    let before = recalled[0].stability;

    engine.record_compression_survival(&recalled[0].id);
    let report = engine.stability_report();
    assert!(report[0].compression_survived);
    assert_eq!(
        report[0].stability_score,
        ((before + 0.25) * 10_000.0).round() / 10_000.0
    );
}

#[test]
fn context_switches_track_persistence_ratio() {
    // Tracker-level check with a pinned clock: a pattern recalled just
    // before a switch persists; a long-idle one does not.
    let dir = tempfile::tempdir().unwrap();
    let mut tracker = StabilityTracker::load(dir.path().join("stability_metrics.json"));

    tracker.record_hit_at("fresh", "recently active pattern", t0());
    tracker.record_hit_at("stale", "long idle pattern", t0() - Duration::hours(3));

    tracker.record_context_switch_at(t0() + Duration::minutes(2));

    let fresh = tracker.metrics("fresh").unwrap();
    let stale = tracker.metrics("stale").unwrap();
    assert_eq!(fresh.frame_persistence, 1);
    assert_eq!(fresh.context_switches_seen, 1);
    assert_eq!(stale.frame_persistence, 0);
    assert_eq!(stale.context_switches_seen, 1);
    assert!(fresh.stability_score() > stale.stability_score());
}

#[test]
fn engine_context_switch_covers_all_patterns() {
    let (_root, engine) = scratch_engine();
    engine.store("pattern one", None).unwrap();
    engine.store("pattern two", None).unwrap();
    engine.recall("pattern one", &RecallOptions::default()).unwrap();
    engine.recall("pattern two", &RecallOptions::default()).unwrap();

    engine.record_context_switch();

    // Both were just recalled, inside the recency window.
    for row in engine.stability_report() {
        assert_eq!(row.frame_persistence, 1);
    }
}

#[test]
fn scores_stay_in_unit_range_across_the_journey() {
    let (_root, engine) = scratch_engine();
    engine.store("bounded pattern", None).unwrap();
    for _ in 0..30 {
        let results = engine
            .recall("bounded pattern", &RecallOptions::default())
            .unwrap();
        let s = results[0].stability;
        assert!((0.0..=1.0).contains(&s), "score out of range: {s}");
    }
    engine.record_context_switch();
    let report = engine.stability_report();
    assert!((0.0..=1.0).contains(&report[0].stability_score));
}
