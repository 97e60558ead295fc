//! Chunk routing - keyword-based domain partitioning
//!
//! Memories are routed to named chunks (`code`, `hardware`, ...) by keyword
//! substring matching, each chunk a physical directory under the store root.
//! Routing is advisory: recall always unions the routed set with `general`
//! and with whatever chunks exist on disk, so a memory stored under an old
//! routing stays reachable.

// ============================================================================
// ROUTING TABLE
// ============================================================================

/// Catch-all chunk for unrouted text.
pub const DEFAULT_CHUNK: &str = "general";

/// Maximum router-selected chunks per recall (before the general union).
pub const MAX_RECALL_CHUNKS: usize = 3;

/// The fixed routing table. Keywords are matched as lowercase substrings.
pub const CHUNK_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "code",
        &[
            "python", "rust", "code", "bug", "debug", "compile", "function", "class", "import",
            "git", "commit", "api", "server", "deploy", "docker", "test", "refactor", "script",
            "variable", "error", "exception", "lint", "cargo", "npm", "pip", "branch", "merge",
            "syntax", "frontend", "backend", "database", "sql", "html", "css", "javascript",
            "typescript",
        ],
    ),
    (
        "hardware",
        &[
            "printer", "3d print", "solder", "circuit", "arduino", "raspberry", "gpio", "wire",
            "pcb", "resistor", "capacitor", "motor", "sensor", "voltage", "ampere",
            "oscilloscope", "multimeter", "firmware", "hardware", "cnc", "laser", "filament",
            "nozzle", "extruder", "bambu", "ender", "stepper",
        ],
    ),
    (
        "daily_tasks",
        &[
            "grocery", "groceries", "dentist", "doctor", "appointment", "schedule", "meeting",
            "call", "email", "buy", "pick up", "todo", "errand", "laundry", "clean", "cook",
            "dinner", "lunch", "breakfast", "workout", "exercise", "gym",
        ],
    ),
    (
        "science",
        &[
            "physics", "chemistry", "biology", "math", "equation", "theorem", "hypothesis",
            "experiment", "quantum", "relativity", "entropy", "molecule", "atom", "cell",
            "genome", "evolution", "neuron", "calculus", "algebra", "statistics", "probability",
        ],
    ),
    (
        "meta",
        &[
            "wheeler", "memory system", "attractor", "brick", "cellular automata", "ca dynamics",
            "rotation", "convergence", "oscillation", "chunk",
        ],
    ),
];

fn score(lower: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|kw| lower.contains(*kw)).count()
}

// ============================================================================
// ROUTING
// ============================================================================

/// Pick the single best chunk for storing `text`.
///
/// The chunk with the most keyword hits wins. Zero hits, or a tie for the
/// top score, falls back to [`DEFAULT_CHUNK`]: an ambiguous text belongs to
/// neither domain more than the other.
pub fn route_store(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    let mut best_chunk = DEFAULT_CHUNK;
    let mut best_hits = 0usize;
    let mut tied = false;

    for (chunk, keywords) in CHUNK_KEYWORDS {
        let hits = score(&lower, keywords);
        if hits > best_hits {
            best_hits = hits;
            best_chunk = chunk;
            tied = false;
        } else if hits > 0 && hits == best_hits {
            tied = true;
        }
    }

    if tied { DEFAULT_CHUNK } else { best_chunk }
}

/// Pick the chunks to scan when recalling `query`.
///
/// Every chunk with a positive score, highest first, capped at
/// [`MAX_RECALL_CHUNKS`], always followed by [`DEFAULT_CHUNK`]. The storage
/// layer further unions this with the chunks present on disk.
pub fn route_recall(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    let mut scored: Vec<(&str, usize)> = CHUNK_KEYWORDS
        .iter()
        .map(|(chunk, keywords)| (*chunk, score(&lower, keywords)))
        .filter(|(_, hits)| *hits > 0)
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1));

    let mut selected: Vec<String> = scored
        .into_iter()
        .take(MAX_RECALL_CHUNKS)
        .map(|(name, _)| name.to_string())
        .collect();

    if !selected.iter().any(|c| c == DEFAULT_CHUNK) {
        selected.push(DEFAULT_CHUNK.to_string());
    }
    selected
}

// ============================================================================
// TESTS
// ============================================================================
