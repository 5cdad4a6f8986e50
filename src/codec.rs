//! Record codec: raw headerless bytes to a typed row-major matrix.
//!
//! Byte `i` of a u8 stream belongs to record `i / width`, dimension
//! `i % width`. Bytes past the last full record are ignored.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{KnnError, Result};
use crate::matrix::{alloc, Matrix, Scalar};

/// On-disk sample encoding of one record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
    /// One unsigned byte per sample (tiny-image pixels).
    U8,
    /// Little-endian f32 per sample (GIST descriptors).
    F32Le,
}

impl RecordFormat {
    pub fn bytes_per_sample(self) -> usize {
        match self { RecordFormat::U8 => 1, RecordFormat::F32Le => 4 }
    }
}

/// Widen each byte to `T` and group into rows of `record_width` samples.
pub fn decode<T: Scalar>(bytes: &[u8], record_width: usize) -> Result<Matrix<T>> {
    if record_width == 0 {
        return Err(KnnError::config("record_width must be positive"));
    }
    let rows = bytes.len() / record_width;
    let used = rows * record_width;
    note_trailing(bytes.len() - used, record_width);

    let mut data = alloc(used)?;
    data.extend(bytes[..used].iter().map(|&b| T::from_u8(b)));
    Matrix::from_vec(data, record_width)
}

/// Decode records of `dims` little-endian f32 values.
pub fn decode_f32_le(bytes: &[u8], dims: usize) -> Result<Matrix<f32>> {
    if dims == 0 {
        return Err(KnnError::config("record_width must be positive"));
    }
    let record_bytes = dims * 4;
    let rows = bytes.len() / record_bytes;
    let used = rows * record_bytes;
    note_trailing(bytes.len() - used, record_bytes);

    let mut data = alloc(rows * dims)?;
    data.extend(
        bytes[..used]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])),
    );
    Matrix::from_vec(data, dims)
}

/// Read the whole file and decode it as u8 samples widened to `T`.
pub fn read_file<T: Scalar>(path: &Path, record_width: usize) -> Result<Matrix<T>> {
    let bytes = read_bytes(path)?;
    let m = decode(&bytes, record_width)?;
    info!(path = %path.display(), rows = m.rows(), cols = m.cols(), "decoded dataset");
    Ok(m)
}

/// Read the whole file as little-endian f32 records.
pub fn read_file_f32_le(path: &Path, dims: usize) -> Result<Matrix<f32>> {
    let bytes = read_bytes(path)?;
    let m = decode_f32_le(&bytes, dims)?;
    info!(path = %path.display(), rows = m.rows(), cols = m.cols(), "decoded f32 dataset");
    Ok(m)
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| KnnError::io(format!("reading {}", path.display()), e))
}

fn note_trailing(extra: usize, record_bytes: usize) {
    if extra != 0 {
        warn!(extra, record_bytes, "ignoring trailing partial record");
    }
}
