//! Test harness - isolated engine roots and calibrated fixtures
//!
//! Every test gets its own temporary store root so suites can run
//! concurrently without sharing index files or locks.

use tempfile::TempDir;
use wheeler_core::{EngineConfig, MemoryEngine};

/// The calibrated 20-sentence diversity fixture. The attractors of these
/// inputs define the diversity contract (mean off-diagonal |r| < 0.5,
/// max < 0.85).
pub const TEST_SENTENCES: [&str; 20] = [
    "Fix authentication bug in login flow",
    "Deploy Kubernetes cluster on AWS",
    "Buy groceries: milk, eggs, bread",
    "Schedule dentist appointment for Thursday",
    "Quantum entanglement violates Bell inequalities",
    "The mitochondria is the powerhouse of the cell",
    "Review pull request #42 for memory leaks",
    "Plan birthday party for next Saturday",
    "Configure NGINX reverse proxy with TLS",
    "Water the garden every morning at 7am",
    "Implement binary search tree in Rust",
    "Book flight to Tokyo for March conference",
    "Dark matter comprises 27% of the universe",
    "Refactor database schema for multi-tenancy",
    "Practice piano scales for 30 minutes daily",
    "Debug segfault in GPU kernel launch",
    "Write unit tests for payment processing",
    "Organize closet by season and color",
    "Black holes emit Hawking radiation",
    "Compile FFmpeg with hardware acceleration",
];

/// An engine rooted in a fresh temporary directory. Keep the `TempDir`
/// alive for the duration of the test.
pub fn scratch_engine() -> (TempDir, MemoryEngine) {
    let dir = tempfile::tempdir().expect("failed to create temp root");
    let engine = MemoryEngine::new(EngineConfig {
        root: Some(dir.path().to_path_buf()),
        ..Default::default()
    })
    .expect("failed to open engine");
    (dir, engine)
}
