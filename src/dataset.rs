//! Persisted form of the reference set: an embeddings file plus an
//! identifier sidecar.
//!
//! The embeddings file is a simple binary format optimized for one-shot
//! sequential loading:
//! - Header (16 bytes): magic, version, dimension, entry count
//! - Payload: contiguous f32 arrays in little-endian format
//!
//! Identifiers live next to it as a JSON array of strings, one per
//! embedding, in the same order. The pair is read through a memory map at
//! store construction and never touched again for the process lifetime.
//!
//! Only the shape contract is load-bearing: equal sequence lengths and one
//! dimension throughout. The store layer owns that check; this module only
//! decides whether the bytes on disk are well-formed at all.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matcher::{EmbeddingDimension, MatcherError};

/// Current dataset format version.
const DATASET_VERSION: u32 = 1;

/// Size of the embeddings file header in bytes.
const HEADER_SIZE: usize = 16;

/// Magic bytes identifying reference embedding files.
const MAGIC_BYTES: &[u8; 4] = b"MVEC";

/// Number of bytes per f32 value.
const BYTES_PER_F32: usize = 4;

/// Errors specific to reading or writing the dataset pair.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid dataset format: {0}")]
    InvalidFormat(String),

    #[error("Matcher error: {0}")]
    Matcher(#[from] MatcherError),
}

/// Locations of the two files that make up a persisted reference set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSource {
    /// Binary embeddings file.
    pub embeddings_path: PathBuf,

    /// JSON identifier sidecar, parallel to the embeddings file.
    pub identifiers_path: PathBuf,
}

impl DatasetSource {
    /// Creates a source from explicit file locations.
    pub fn new(embeddings_path: impl Into<PathBuf>, identifiers_path: impl Into<PathBuf>) -> Self {
        Self {
            embeddings_path: embeddings_path.into(),
            identifiers_path: identifiers_path.into(),
        }
    }

    /// Creates a source using the conventional file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            embeddings_path: dir.join("references.mvec"),
            identifiers_path: dir.join("references.json"),
        }
    }
}

/// Reads the dataset pair into parallel identifier and embedding sequences.
///
/// Returns the sequences exactly as persisted, in file order. No length
/// cross-check happens here; `EmbeddingStore::from_entries` owns integrity.
///
/// # Errors
/// `Io` when either file is missing or unreadable, `InvalidFormat` when the
/// embeddings file fails structural validation or the sidecar is not a JSON
/// string array. Callers wanting the degraded empty-store behavior map
/// these to an empty store.
pub fn read_reference_set(
    source: &DatasetSource,
) -> Result<(Vec<String>, Vec<Vec<f32>>), DatasetError> {
    let identifiers = read_identifiers(&source.identifiers_path)?;
    let embeddings = read_embeddings(&source.embeddings_path)?;
    Ok((identifiers, embeddings))
}

/// Writes the dataset pair, creating parent directories as needed.
///
/// Every embedding is validated against `dimension` before any byte is
/// written, so a failed write cannot leave a half-valid pair behind a
/// passing header.
pub fn write_reference_set(
    source: &DatasetSource,
    identifiers: &[String],
    embeddings: &[Vec<f32>],
    dimension: EmbeddingDimension,
) -> Result<(), DatasetError> {
    if identifiers.len() != embeddings.len() {
        return Err(MatcherError::EntryCountMismatch {
            identifiers: identifiers.len(),
            embeddings: embeddings.len(),
        }
        .into());
    }
    for embedding in embeddings {
        dimension.validate_vector(embedding)?;
    }

    write_embeddings(&source.embeddings_path, embeddings, dimension)?;
    write_identifiers(&source.identifiers_path, identifiers)?;
    Ok(())
}

fn read_identifiers(path: &Path) -> Result<Vec<String>, DatasetError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| {
        DatasetError::InvalidFormat(format!("Identifier sidecar is not a JSON string array: {e}"))
    })
}

fn read_embeddings(path: &Path) -> Result<Vec<Vec<f32>>, DatasetError> {
    let file = File::open(path)?;
    let mmap = unsafe { MmapOptions::new().map(&file)? };

    let (dimension, count) = read_header(&mmap)?;
    let payload_size = count
        .checked_mul(dimension)
        .and_then(|values| values.checked_mul(BYTES_PER_F32))
        .ok_or_else(|| {
            DatasetError::InvalidFormat("Header describes an impossibly large payload".to_string())
        })?;
    if mmap.len() < HEADER_SIZE + payload_size {
        return Err(DatasetError::InvalidFormat(format!(
            "Truncated payload: header describes {count} entries of dimension {dimension}, file holds {} bytes",
            mmap.len()
        )));
    }

    let mut embeddings = Vec::with_capacity(count);
    let mut offset = HEADER_SIZE;
    for _ in 0..count {
        let mut vector = Vec::with_capacity(dimension);
        for i in 0..dimension {
            let at = offset + i * BYTES_PER_F32;
            vector.push(f32::from_le_bytes([
                mmap[at],
                mmap[at + 1],
                mmap[at + 2],
                mmap[at + 3],
            ]));
        }
        embeddings.push(vector);
        offset += dimension * BYTES_PER_F32;
    }

    Ok(embeddings)
}

fn read_header(mmap: &Mmap) -> Result<(usize, usize), DatasetError> {
    if mmap.len() < HEADER_SIZE {
        return Err(DatasetError::InvalidFormat(
            "File too small to contain header".to_string(),
        ));
    }

    if &mmap[0..4] != MAGIC_BYTES {
        return Err(DatasetError::InvalidFormat(
            "Invalid magic bytes".to_string(),
        ));
    }

    let version = u32::from_le_bytes([mmap[4], mmap[5], mmap[6], mmap[7]]);
    if version != DATASET_VERSION {
        return Err(DatasetError::InvalidFormat(format!(
            "Unsupported dataset version: expected {DATASET_VERSION}, got {version}"
        )));
    }

    let dimension = u32::from_le_bytes([mmap[8], mmap[9], mmap[10], mmap[11]]) as usize;
    let count = u32::from_le_bytes([mmap[12], mmap[13], mmap[14], mmap[15]]) as usize;

    if dimension == 0 && count > 0 {
        return Err(DatasetError::InvalidFormat(
            "Header declares entries of dimension zero".to_string(),
        ));
    }

    Ok((dimension, count))
}

fn write_embeddings(
    path: &Path,
    embeddings: &[Vec<f32>],
    dimension: EmbeddingDimension,
) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;

    // Header
    file.write_all(MAGIC_BYTES)?;
    file.write_all(&DATASET_VERSION.to_le_bytes())?;
    file.write_all(&(dimension.get() as u32).to_le_bytes())?;
    file.write_all(&(embeddings.len() as u32).to_le_bytes())?;

    // Payload
    for embedding in embeddings {
        for &value in embedding {
            file.write_all(&value.to_le_bytes())?;
        }
    }

    file.flush()?;
    Ok(())
}

fn write_identifiers(path: &Path, identifiers: &[String]) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(identifiers).map_err(|e| {
        DatasetError::InvalidFormat(format!("Failed to serialize identifiers: {e}"))
    })?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_entries() -> (Vec<String>, Vec<Vec<f32>>) {
        (
            vec![
                "images/neon_city.jpg".to_string(),
                "images/desert_dawn.jpg".to_string(),
                "images/rainy_window.jpg".to_string(),
            ],
            vec![
                vec![1.0, 0.0, 0.5],
                vec![0.0, 1.0, -0.5],
                vec![0.25, 0.25, 0.25],
            ],
        )
    }

    #[test]
    fn test_round_trip_preserves_entries_and_order() {
        let temp_dir = TempDir::new().unwrap();
        let source = DatasetSource::in_dir(temp_dir.path());
        let (identifiers, embeddings) = sample_entries();

        write_reference_set(
            &source,
            &identifiers,
            &embeddings,
            EmbeddingDimension::new(3).unwrap(),
        )
        .unwrap();

        let (loaded_ids, loaded_embeddings) = read_reference_set(&source).unwrap();
        assert_eq!(loaded_ids, identifiers);
        assert_eq!(loaded_embeddings, embeddings);
    }

    #[test]
    fn test_missing_files_are_io_errors() {
        let temp_dir = TempDir::new().unwrap();
        let source = DatasetSource::in_dir(temp_dir.path());

        assert!(matches!(
            read_reference_set(&source),
            Err(DatasetError::Io(_))
        ));
    }

    #[test]
    fn test_invalid_magic_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let source = DatasetSource::in_dir(temp_dir.path());

        std::fs::write(&source.identifiers_path, "[]").unwrap();
        std::fs::write(&source.embeddings_path, b"NOPE\x01\x00\x00\x00\x02\x00\x00\x00\x00\x00\x00\x00").unwrap();

        assert!(matches!(
            read_reference_set(&source),
            Err(DatasetError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let temp_dir = TempDir::new().unwrap();
        let source = DatasetSource::in_dir(temp_dir.path());

        std::fs::write(&source.identifiers_path, "[]").unwrap();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC_BYTES);
        bytes.extend_from_slice(&99u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        std::fs::write(&source.embeddings_path, bytes).unwrap();

        match read_reference_set(&source) {
            Err(DatasetError::InvalidFormat(msg)) => assert!(msg.contains("version")),
            other => panic!("Expected InvalidFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_payload() {
        let temp_dir = TempDir::new().unwrap();
        let source = DatasetSource::in_dir(temp_dir.path());

        std::fs::write(&source.identifiers_path, r#"["a", "b"]"#).unwrap();
        // Header promises 2 entries of dimension 4, payload holds one value
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC_BYTES);
        bytes.extend_from_slice(&DATASET_VERSION.to_le_bytes());
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
        std::fs::write(&source.embeddings_path, bytes).unwrap();

        assert!(matches!(
            read_reference_set(&source),
            Err(DatasetError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_malformed_sidecar() {
        let temp_dir = TempDir::new().unwrap();
        let source = DatasetSource::in_dir(temp_dir.path());
        let (_, embeddings) = sample_entries();

        write_reference_set(
            &source,
            &["a".to_string(), "b".to_string(), "c".to_string()],
            &embeddings,
            EmbeddingDimension::new(3).unwrap(),
        )
        .unwrap();
        std::fs::write(&source.identifiers_path, "{not json").unwrap();

        assert!(matches!(
            read_reference_set(&source),
            Err(DatasetError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_write_rejects_mismatched_lengths() {
        let temp_dir = TempDir::new().unwrap();
        let source = DatasetSource::in_dir(temp_dir.path());

        let result = write_reference_set(
            &source,
            &["only_one".to_string()],
            &[vec![1.0, 0.0], vec![0.0, 1.0]],
            EmbeddingDimension::new(2).unwrap(),
        );

        assert!(matches!(
            result,
            Err(DatasetError::Matcher(MatcherError::EntryCountMismatch { .. }))
        ));
        // Nothing was written
        assert!(!source.embeddings_path.exists());
    }

    #[test]
    fn test_write_rejects_wrong_dimension() {
        let temp_dir = TempDir::new().unwrap();
        let source = DatasetSource::in_dir(temp_dir.path());

        let result = write_reference_set(
            &source,
            &["a".to_string()],
            &[vec![1.0, 0.0, 0.0]],
            EmbeddingDimension::new(2).unwrap(),
        );

        assert!(matches!(
            result,
            Err(DatasetError::Matcher(MatcherError::DimensionMismatch { .. }))
        ));
    }

    #[test]
    fn test_empty_dataset_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let source = DatasetSource::in_dir(temp_dir.path());

        write_reference_set(&source, &[], &[], EmbeddingDimension::new(3).unwrap()).unwrap();

        let (identifiers, embeddings) = read_reference_set(&source).unwrap();
        assert!(identifiers.is_empty());
        assert!(embeddings.is_empty());
    }
}
