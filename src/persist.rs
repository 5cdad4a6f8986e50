use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{KnnError, Result};
use crate::header::ResultHeader;
use crate::matrix::Matrix;
use crate::query::KnnResult;

#[derive(Serialize, Deserialize)]
struct Manifest { header: ResultHeader, rows: usize, k: usize, fingerprint: u64 }

#[derive(Serialize)]
struct NeighbourRecord { id: usize, distance: f64 }

#[derive(Serialize)]
struct QueryRecord { query_id: usize, neighbours: Vec<NeighbourRecord> }

fn io_err(context: &Path, e: io::Error) -> KnnError {
    KnnError::io(context.display().to_string(), e)
}

fn json_err(context: &Path, e: serde_json::Error) -> KnnError {
    io_err(context, io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write `header.json`, `indices.i32` and `distances.f64` (little endian, row-major).
pub fn save_dir(dir: &Path, result: &KnnResult, header: &ResultHeader) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let man = Manifest { header: header.clone(), rows: result.rows(), k: result.k(), fingerprint: result.fingerprint() };
    let path = dir.join("header.json");
    let bytes = serde_json::to_vec_pretty(&man).map_err(|e| json_err(&path, e))?;
    fs::write(&path, bytes).map_err(|e| io_err(&path, e))?;

    let path = dir.join("indices.i32");
    let buf: Vec<u8> = result.indices.as_slice().iter().flat_map(|i| i.to_le_bytes()).collect();
    fs::write(&path, buf).map_err(|e| io_err(&path, e))?;

    let path = dir.join("distances.f64");
    let buf: Vec<u8> = result.distances.as_slice().iter().flat_map(|d| d.to_le_bytes()).collect();
    fs::write(&path, buf).map_err(|e| io_err(&path, e))?;

    info!(dir = %dir.display(), rows = result.rows(), k = result.k(), "saved results");
    Ok(())
}

/// Read a directory written by [`save_dir`], verifying its fingerprint.
pub fn load_dir(dir: &Path) -> Result<(ResultHeader, KnnResult)> {
    let path = dir.join("header.json");
    let bytes = fs::read(&path).map_err(|e| io_err(&path, e))?;
    let man: Manifest = serde_json::from_slice(&bytes).map_err(|e| json_err(&path, e))?;
    if man.header.version < 1 {
        return Err(io_err(&path, io::Error::new(io::ErrorKind::InvalidData, "unsupported result version")));
    }
    if man.k == 0 {
        return Err(KnnError::config("saved result has k = 0"));
    }
    let cells = man.rows.checked_mul(man.k).ok_or_else(|| {
        io_err(&path, io::Error::new(io::ErrorKind::InvalidData, "result shape overflows"))
    })?;
    let (id_bytes, dist_bytes) = match (cells.checked_mul(4), cells.checked_mul(8)) {
        (Some(i), Some(d)) => (i, d),
        _ => return Err(io_err(&path, io::Error::new(io::ErrorKind::InvalidData, "result shape overflows"))),
    };

    let path = dir.join("indices.i32");
    let ib = fs::read(&path).map_err(|e| io_err(&path, e))?;
    if ib.len() != id_bytes {
        return Err(io_err(&path, io::Error::new(io::ErrorKind::UnexpectedEof, "truncated indices")));
    }
    let ids: Vec<i32> = ib.chunks_exact(4).map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect();

    let path = dir.join("distances.f64");
    let db = fs::read(&path).map_err(|e| io_err(&path, e))?;
    if db.len() != dist_bytes {
        return Err(io_err(&path, io::Error::new(io::ErrorKind::UnexpectedEof, "truncated distances")));
    }
    let ds: Vec<f64> = db
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect();

    let result = KnnResult { indices: Matrix::from_vec(ids, man.k)?, distances: Matrix::from_vec(ds, man.k)? };
    if result.fingerprint() != man.fingerprint {
        return Err(io_err(dir, io::Error::new(io::ErrorKind::InvalidData, "fingerprint mismatch")));
    }
    Ok((man.header, result))
}

/// One JSON array of `{query_id, neighbours: [{id, distance}]}` records.
/// `query_ids` maps result rows to caller ids; row numbers are used when absent.
pub fn write_json(path: &Path, result: &KnnResult, query_ids: Option<&[usize]>) -> Result<()> {
    if let Some(ids) = query_ids {
        if ids.len() != result.rows() {
            return Err(KnnError::config(format!("{} query ids for {} result rows", ids.len(), result.rows())));
        }
    }
    let records: Vec<QueryRecord> = (0..result.rows())
        .map(|r| QueryRecord {
            query_id: query_ids.map_or(r, |ids| ids[r]),
            neighbours: result.neighbors(r).map(|(id, distance)| NeighbourRecord { id, distance }).collect(),
        })
        .collect();
    let f = fs::File::create(path).map_err(|e| io_err(path, e))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer(&mut w, &records).map_err(|e| json_err(path, e))?;
    w.flush().map_err(|e| io_err(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RecordFormat;
    use crate::config::KnnConfig;
    use crate::types::NO_NEIGHBOR;

    fn sample() -> KnnResult {
        KnnResult {
            indices: Matrix::from_vec(vec![0, 2, 1, NO_NEIGHBOR], 2).unwrap(),
            distances: Matrix::from_vec(vec![0.0, 4.5, 0.0, f64::INFINITY], 2).unwrap(),
        }
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let header = ResultHeader::new(KnnConfig::default(), RecordFormat::U8, 3, 2, Some(vec![0, 1]));
        save_dir(dir.path(), &sample(), &header).unwrap();
        let (h, r) = load_dir(dir.path()).unwrap();
        assert_eq!(h, header);
        assert_eq!(r, sample());
    }

    #[test]
    fn tampered_distances_detected() {
        let dir = tempfile::tempdir().unwrap();
        let header = ResultHeader::new(KnnConfig::default(), RecordFormat::U8, 3, 2, None);
        save_dir(dir.path(), &sample(), &header).unwrap();
        let mut bytes = fs::read(dir.path().join("distances.f64")).unwrap();
        bytes[4] ^= 0x01;
        fs::write(dir.path().join("distances.f64"), bytes).unwrap();
        assert!(matches!(load_dir(dir.path()), Err(KnnError::Io { .. })));
    }

    #[test]
    fn oversized_shape_in_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let header = ResultHeader::new(KnnConfig::default(), RecordFormat::U8, 3, 2, None);
        save_dir(dir.path(), &sample(), &header).unwrap();
        let path = dir.path().join("header.json");
        let mut man: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        man["rows"] = serde_json::json!(usize::MAX / 2);
        man["k"] = serde_json::json!(4);
        fs::write(&path, serde_json::to_vec(&man).unwrap()).unwrap();
        match load_dir(dir.path()) {
            Err(KnnError::Io { source, .. }) => assert_eq!(source.kind(), io::ErrorKind::InvalidData),
            other => panic!("expected InvalidData, got {other:?}"),
        }
    }

    #[test]
    fn json_skips_sentinels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(&path, &sample(), Some(&[10, 11])).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(v[0]["query_id"], 10);
        assert_eq!(v[0]["neighbours"].as_array().unwrap().len(), 2);
        assert_eq!(v[1]["neighbours"].as_array().unwrap().len(), 1);
        assert_eq!(v[1]["neighbours"][0]["id"], 1);
    }
}
