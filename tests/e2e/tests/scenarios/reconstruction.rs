//! Reconstructive recall - same memory, different contexts
//!
//! The stored attractor blended with two unrelated query contexts and
//! re-evolved must produce two visibly different reconstructions, each
//! still anchored to the stored memory.

use wheeler_e2e_tests::harness::scratch_engine;
use wheeler_core::{
    evolve, hash_frame, pearson, reconstruct, reconstruct_batch, RecallOptions, DEFAULT_ALPHA,
    DEFAULT_MAX_ITERS,
};

const STORED: &str = "Python is a versatile programming language";
const CONTEXT_ML: &str = "machine learning neural networks";
const CONTEXT_WEB: &str = "web server flask django";

#[test]
fn contexts_pull_the_same_memory_apart() {
    let (_root, engine) = scratch_engine();
    engine.store(STORED, None).unwrap();

    let opts = RecallOptions {
        top_k: 1,
        reconstruct: true,
        alpha: DEFAULT_ALPHA,
        ..Default::default()
    };
    let ml = engine.recall(CONTEXT_ML, &opts).unwrap();
    let web = engine.recall(CONTEXT_WEB, &opts).unwrap();

    let ml_recon = ml[0].reconstruction.as_ref().expect("no reconstruction");
    let web_recon = web[0].reconstruction.as_ref().expect("no reconstruction");

    // Each reconstruction stays anchored to the stored memory.
    assert!(
        ml_recon.correlation_with_stored > 0.5,
        "ML context lost the memory: {}",
        ml_recon.correlation_with_stored
    );
    assert!(
        web_recon.correlation_with_stored > 0.5,
        "web context lost the memory: {}",
        web_recon.correlation_with_stored
    );

    // But the two context-dependent reconstructions diverge.
    let cross = pearson(&ml_recon.attractor, &web_recon.attractor);
    assert!(cross < 0.8, "reconstructions failed to diverge: r = {cross:.4}");
}

#[test]
fn reconstruction_is_pure_no_storage_writes() {
    let (_root, engine) = scratch_engine();
    let stored = engine.store(STORED, None).unwrap();

    let tensor_path = engine
        .root()
        .join(format!("chunks/{}/attractors/{}.tensor", stored.chunk, stored.id));
    let tensor_bytes = std::fs::read(&tensor_path).unwrap();

    engine
        .recall(
            CONTEXT_ML,
            &RecallOptions {
                top_k: 1,
                reconstruct: true,
                ..Default::default()
            },
        )
        .unwrap();

    let after = std::fs::read(&tensor_path).unwrap();
    assert_eq!(tensor_bytes, after, "reconstruction modified the stored tensor");
}

#[test]
fn alpha_sweep_trades_memory_for_context() {
    let stored = evolve(&hash_frame(STORED), DEFAULT_MAX_ITERS).attractor;
    let context = evolve(&hash_frame(CONTEXT_ML), DEFAULT_MAX_ITERS).attractor;

    let faithful = reconstruct(&stored, &context, 0.0, DEFAULT_MAX_ITERS);
    let contextual = reconstruct(&stored, &context, 0.7, DEFAULT_MAX_ITERS);

    assert!(faithful.correlation_with_stored > contextual.correlation_with_stored);
    assert!(contextual.correlation_with_query > faithful.correlation_with_query);
}

#[test]
fn batch_reconstruction_matches_singles() {
    let stored = [
        evolve(&hash_frame("first stored memory"), DEFAULT_MAX_ITERS).attractor,
        evolve(&hash_frame("second stored memory"), DEFAULT_MAX_ITERS).attractor,
        evolve(&hash_frame("third stored memory"), DEFAULT_MAX_ITERS).attractor,
    ];
    let query = evolve(&hash_frame(CONTEXT_WEB), DEFAULT_MAX_ITERS).attractor;

    let batch = reconstruct_batch(&stored, &query, DEFAULT_ALPHA, DEFAULT_MAX_ITERS);
    assert_eq!(batch.len(), 3);
    for (s, r) in stored.iter().zip(&batch) {
        let single = reconstruct(s, &query, DEFAULT_ALPHA, DEFAULT_MAX_ITERS);
        assert_eq!(single.attractor, r.attractor);
        assert_eq!(single.state, r.state);
    }
}
