//! Memory bricks - the full temporal record of memory formation
//!
//! A brick captures every tick of a memory's evolution, seed through final
//! attractor, for audit and failure analysis. One zstd-compressed container
//! per memory: a small uncompressed magic/version prefix, then a compressed
//! stream of a JSON header (verdict, tick count, frame count, metadata bag)
//! followed by the stacked frame payload and the final attractor as raw
//! little-endian f32 cells.

use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dynamics::{roles, ConvergenceState, Evolution};
use crate::error::{MemoryError, Result};
use crate::frame::Frame;
use crate::storage::{atomic_write_bytes, read_cells, write_cells};

/// Container magic.
const BRICK_MAGIC: &[u8; 4] = b"WBRK";

/// Current brick format version.
pub const BRICK_FORMAT_VERSION: u16 = 1;

// ============================================================================
// BRICK
// ============================================================================

/// Complete temporal record of one memory's formation.
#[derive(Debug, Clone)]
pub struct Brick {
    /// Every frame from seed to final, inclusive.
    pub history: Vec<Frame>,
    /// The settled (or best-effort) final frame.
    pub attractor: Frame,
    /// Verdict of the recorded evolution.
    pub state: ConvergenceState,
    /// Ticks the evolution ran.
    pub ticks: u32,
    /// Free-form JSON metadata bag (rotation, attempts, input preview, ...).
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize, Deserialize)]
struct BrickHeader {
    state: ConvergenceState,
    ticks: u32,
    frames: u32,
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl Brick {
    /// Build a brick from an evolution result, folding in extra metadata.
    pub fn from_evolution(
        evolution: &Evolution,
        extra_metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        let mut metadata = serde_json::Map::new();
        if let Some(osc) = &evolution.oscillation {
            metadata.insert("cycle_period".to_string(), osc.period.into());
            metadata.insert(
                "oscillating_cells".to_string(),
                osc.oscillating_cells.into(),
            );
        }
        metadata.extend(extra_metadata);

        Self {
            history: evolution.history.clone(),
            attractor: evolution.attractor.clone(),
            state: evolution.state,
            ticks: evolution.ticks,
            metadata,
        }
    }

    /// Frame at tick `n` (0 is the seed).
    pub fn frame_at(&self, n: usize) -> Option<&Frame> {
        self.history.get(n)
    }

    /// For oscillating bricks, the tick where role-space periodicity began.
    ///
    /// Scans backwards from the end until roles stop repeating with the
    /// recorded cycle period. `None` for bricks that settled normally.
    pub fn divergence_point(&self) -> Option<usize> {
        if self.state != ConvergenceState::Oscillating {
            return None;
        }
        let period = self
            .metadata
            .get("cycle_period")
            .and_then(|v| v.as_u64())
            .unwrap_or(2) as usize;
        let n = self.history.len();
        if n <= period + 1 {
            return Some(0);
        }

        for t in (1..(n - period)).rev() {
            let a = roles(&self.history[t]);
            let b = roles(&self.history[t + period]);
            if a != b {
                return Some(t + 1);
            }
        }
        Some(0)
    }

    // ------------------------------------------------------------------
    // Container I/O
    // ------------------------------------------------------------------

    /// Serialize to the brick container format.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let header = BrickHeader {
            state: self.state,
            ticks: self.ticks,
            frames: self.history.len() as u32,
            metadata: self.metadata.clone(),
        };
        let header_bytes = serde_json::to_vec(&header)?;

        let mut out = Vec::new();
        out.extend_from_slice(BRICK_MAGIC);
        out.extend_from_slice(&BRICK_FORMAT_VERSION.to_le_bytes());

        let mut encoder = zstd::Encoder::new(&mut out, zstd::DEFAULT_COMPRESSION_LEVEL)?;
        encoder.write_all(&(header_bytes.len() as u32).to_le_bytes())?;
        encoder.write_all(&header_bytes)?;
        for frame in &self.history {
            write_cells(&mut encoder, frame)?;
        }
        write_cells(&mut encoder, &self.attractor)?;
        encoder.finish()?;

        Ok(out)
    }

    /// Parse a brick container.
    pub fn decode(bytes: &[u8], path: &Path) -> Result<Self> {
        let malformed = |reason: &str| MemoryError::MalformedFile {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        if bytes.len() < 6 {
            return Err(malformed("truncated container"));
        }
        if &bytes[..4] != BRICK_MAGIC {
            return Err(malformed("bad magic"));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != BRICK_FORMAT_VERSION {
            return Err(MemoryError::VersionMismatch {
                found: version,
                expected: BRICK_FORMAT_VERSION,
            });
        }

        let mut decoder = zstd::Decoder::new(&bytes[6..])?;

        let mut len_bytes = [0u8; 4];
        decoder
            .read_exact(&mut len_bytes)
            .map_err(|_| malformed("truncated header"))?;
        let header_len = u32::from_le_bytes(len_bytes) as usize;

        let mut header_bytes = vec![0u8; header_len];
        decoder
            .read_exact(&mut header_bytes)
            .map_err(|_| malformed("truncated header"))?;
        let header: BrickHeader =
            serde_json::from_slice(&header_bytes).map_err(|_| malformed("unreadable header"))?;

        let mut history = Vec::with_capacity(header.frames as usize);
        for _ in 0..header.frames {
            let frame = read_cells(&mut decoder).map_err(|_| malformed("truncated frames"))?;
            history.push(frame);
        }
        let attractor = read_cells(&mut decoder).map_err(|_| malformed("truncated attractor"))?;

        Ok(Self {
            history,
            attractor,
            state: header.state,
            ticks: header.ticks,
            metadata: header.metadata,
        })
    }

    /// Write to `path` atomically.
    pub fn write(&self, path: &Path) -> Result<()> {
        atomic_write_bytes(path, &self.encode()?)
    }

    /// Read from `path`.
    pub fn read(path: &Path) -> Result<Self> {
        let mut bytes = Vec::new();
        std::fs::File::open(path)?.read_to_end(&mut bytes)?;
        Self::decode(&bytes, path)
    }
}

// ============================================================================
// TESTS
// ============================================================================
