//! Temperature journey - access heat under a pinned clock
//!
//! Drives the storage layer directly so the clock can be mocked; the
//! engine facade always uses the wall clock.

use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;
use wheeler_core::{
    evolve_with_rotation_retry, hash_frame, text_id, AttractorStore, Brick, FrameMode, Tier,
};

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn scratch_store() -> (TempDir, AttractorStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = AttractorStore::open(Some(dir.path().to_path_buf())).unwrap();
    (dir, store)
}

fn store_at(store: &AttractorStore, text: &str, now: DateTime<Utc>) -> String {
    let outcome = evolve_with_rotation_retry(&hash_frame(text), 1000);
    assert!(outcome.converged());
    let brick = Brick::from_evolution(&outcome.evolution, serde_json::Map::new());
    let id = text_id(text);
    store
        .store(&id, text, None, &outcome, &brick, FrameMode::Hash, now)
        .unwrap();
    id
}

fn recall_at(
    store: &AttractorStore,
    text: &str,
    now: DateTime<Utc>,
) -> Vec<wheeler_core::storage::ScoredEntry> {
    let query = evolve_with_rotation_retry(&hash_frame(text), 1000);
    store
        .recall(
            &query.evolution.attractor,
            &store.existing_chunks(),
            1,
            0.0,
            None,
            now,
        )
        .unwrap()
}

#[test]
fn fresh_entry_recalls_warm() {
    let (_dir, store) = scratch_store();
    store_at(&store, "a fresh memory", t0());

    let results = recall_at(&store, "a fresh memory", t0());
    // Zero hits, zero decay: exactly the warm floor.
    assert_eq!(results[0].temperature, 0.3);
    assert_eq!(results[0].tier, Tier::Warm);
}

#[test]
fn immediate_rerecall_is_deterministic_under_mock_time() {
    // The same store + recall sequence at the same mock instants computes
    // the same temperature, machine clock notwithstanding.
    let (_dir, a) = scratch_store();
    let (_dir2, b) = scratch_store();
    store_at(&a, "clock independence", t0());
    store_at(&b, "clock independence", t0());

    let ra = recall_at(&a, "clock independence", t0() + Duration::seconds(5));
    let rb = recall_at(&b, "clock independence", t0() + Duration::seconds(5));
    assert_eq!(ra[0].temperature, rb[0].temperature);
    assert_eq!(ra[0].tier, rb[0].tier);
}

#[test]
fn fourteen_idle_days_decay_to_cold() {
    // Scenario: store, let two half-lives pass untouched, recall. The
    // temperature must be base * 0.25 and the tier cold.
    let (_dir, store) = scratch_store();
    store_at(&store, "memory left to cool", t0());

    let results = recall_at(&store, "memory left to cool", t0() + Duration::days(14));
    assert_eq!(results[0].temperature, 0.075);
    assert_eq!(results[0].tier, Tier::Cold);
}

#[test]
fn repeated_recalls_heat_an_entry_to_hot() {
    let (_dir, store) = scratch_store();
    store_at(&store, "memory recalled over and over", t0());

    for i in 0..5 {
        recall_at(
            &store,
            "memory recalled over and over",
            t0() + Duration::minutes(i),
        );
    }

    // Five prior hits: base = 0.3 + 0.7 * 5/10 = 0.65, negligible decay.
    let results = recall_at(
        &store,
        "memory recalled over and over",
        t0() + Duration::minutes(5),
    );
    assert_eq!(results[0].temperature, 0.65);
    assert_eq!(results[0].tier, Tier::Hot);
}

#[test]
fn recall_refreshes_recency_for_later_scoring() {
    let (_dir, store) = scratch_store();
    store_at(&store, "kept alive by recalls", t0());

    // Touched at day 13; by day 14 only one day of decay remains.
    recall_at(&store, "kept alive by recalls", t0() + Duration::days(13));
    let results = recall_at(&store, "kept alive by recalls", t0() + Duration::days(14));

    // One prior hit, one day of decay: 0.37 * 2^(-1/7).
    let expected = (0.37f64 * 2.0f64.powf(-1.0 / 7.0) * 10_000.0).round() / 10_000.0;
    assert_eq!(results[0].temperature, expected);
}

#[test]
fn listing_reports_live_temperature() {
    let (_dir, store) = scratch_store();
    store_at(&store, "listed while warm", t0());

    let warm = store.list(None, t0()).unwrap();
    assert_eq!(warm[0].temperature, 0.3);
    assert_eq!(warm[0].tier, Tier::Warm);

    let cold = store.list(None, t0() + Duration::days(60)).unwrap();
    assert!(cold[0].temperature < 0.01);
    assert_eq!(cold[0].tier, Tier::Cold);
}
