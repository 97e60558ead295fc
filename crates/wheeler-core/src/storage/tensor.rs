//! Attractor tensor files
//!
//! One settled attractor per file, in a small self-describing binary
//! container: magic, format version, dtype, and dimensions up front, then
//! the raw little-endian f32 cells. The header exists so a future grid size
//! or dtype change is a version bump instead of a silent corruption.

use std::io::{Read, Write};
use std::path::Path;

use crate::error::{MemoryError, Result};
use crate::frame::{Frame, CELLS, GRID};

/// Container magic.
const TENSOR_MAGIC: &[u8; 4] = b"WTEN";

/// Current tensor format version.
pub const TENSOR_FORMAT_VERSION: u16 = 1;

/// dtype tag for little-endian f32.
const DTYPE_F32: u8 = 1;

/// Serialize a frame into the tensor container format.
pub fn encode_tensor(frame: &Frame) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + 2 + 1 + 1 + 4 + CELLS * 4);
    buf.extend_from_slice(TENSOR_MAGIC);
    buf.extend_from_slice(&TENSOR_FORMAT_VERSION.to_le_bytes());
    buf.push(DTYPE_F32);
    buf.push(2); // ndim
    buf.extend_from_slice(&(GRID as u16).to_le_bytes());
    buf.extend_from_slice(&(GRID as u16).to_le_bytes());
    for v in frame.as_slice() {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf
}

/// Parse a tensor container back into a frame.
pub fn decode_tensor(bytes: &[u8], path: &Path) -> Result<Frame> {
    let malformed = |reason: &str| MemoryError::MalformedFile {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let mut cursor = bytes;

    let mut magic = [0u8; 4];
    cursor
        .read_exact(&mut magic)
        .map_err(|_| malformed("truncated header"))?;
    if &magic != TENSOR_MAGIC {
        return Err(malformed("bad magic"));
    }

    let mut version = [0u8; 2];
    cursor
        .read_exact(&mut version)
        .map_err(|_| malformed("truncated header"))?;
    let version = u16::from_le_bytes(version);
    if version != TENSOR_FORMAT_VERSION {
        return Err(MemoryError::VersionMismatch {
            found: version,
            expected: TENSOR_FORMAT_VERSION,
        });
    }

    let mut meta = [0u8; 2];
    cursor
        .read_exact(&mut meta)
        .map_err(|_| malformed("truncated header"))?;
    if meta[0] != DTYPE_F32 {
        return Err(malformed("unsupported dtype"));
    }
    if meta[1] != 2 {
        return Err(malformed("unsupported rank"));
    }

    let mut dims = [0u8; 4];
    cursor
        .read_exact(&mut dims)
        .map_err(|_| malformed("truncated header"))?;
    let rows = u16::from_le_bytes([dims[0], dims[1]]) as usize;
    let cols = u16::from_le_bytes([dims[2], dims[3]]) as usize;
    if rows != GRID || cols != GRID {
        return Err(malformed("unexpected dimensions"));
    }

    if cursor.len() != CELLS * 4 {
        return Err(malformed("payload length mismatch"));
    }

    let mut frame = Frame::zeroed();
    for v in frame.as_mut_slice() {
        let mut cell = [0u8; 4];
        cursor
            .read_exact(&mut cell)
            .map_err(|_| malformed("truncated payload"))?;
        *v = f32::from_le_bytes(cell);
    }
    Ok(frame)
}

/// Write a frame to `path` atomically (sibling temp file, fsync, rename).
pub fn write_tensor(path: &Path, frame: &Frame) -> Result<()> {
    super::atomic_write_bytes(path, &encode_tensor(frame))
}

/// Read a frame from `path`.
pub fn read_tensor(path: &Path) -> Result<Frame> {
    let mut bytes = Vec::new();
    std::fs::File::open(path)?.read_to_end(&mut bytes)?;
    decode_tensor(&bytes, path)
}

// Used by the brick container, which shares the raw cell encoding.
pub(crate) fn write_cells<W: Write>(w: &mut W, frame: &Frame) -> std::io::Result<()> {
    for v in frame.as_slice() {
        w.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}

pub(crate) fn read_cells<R: Read>(r: &mut R) -> std::io::Result<Frame> {
    let mut frame = Frame::zeroed();
    let mut cell = [0u8; 4];
    for v in frame.as_mut_slice() {
        r.read_exact(&mut cell)?;
        *v = f32::from_le_bytes(cell);
    }
    Ok(frame)
}

// ============================================================================
// TESTS
// ============================================================================
