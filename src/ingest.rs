//! Builds the persisted reference set from a directory of images.
//!
//! This is the offline step that precedes any matching: walk the reference
//! image directory, extract an embedding for each image, and write the
//! dataset pair that `EmbeddingStore::load` consumes. Files are processed
//! in sorted path order so the resulting load order (and therefore the
//! ranking tie-break) is reproducible across runs.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::dataset::{self, DatasetError, DatasetSource};
use crate::matcher::{FeatureExtractor, MatcherError};

/// File extensions accepted as reference images.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Summary of one ingest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Number of reference entries written to the dataset.
    pub references: usize,

    /// Number of non-image files skipped during the walk.
    pub skipped: usize,
}

/// Walks `image_dir`, extracts features for every image, and writes the
/// dataset pair at `source`.
///
/// An empty or missing directory is not an error: it produces a valid
/// empty dataset, which downstream becomes the degraded empty store.
///
/// # Errors
/// Fails when feature extraction fails or the dataset pair cannot be
/// written.
pub fn build_reference_set(
    image_dir: &Path,
    extractor: &dyn FeatureExtractor,
    source: &DatasetSource,
) -> Result<IngestReport, DatasetError> {
    let mut images: Vec<PathBuf> = Vec::new();
    let mut skipped = 0usize;

    for entry in WalkDir::new(image_dir).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if is_image(&path) {
            images.push(path);
        } else {
            skipped += 1;
        }
    }

    // Sorted path order fixes the dataset's load order.
    images.sort();

    if images.is_empty() {
        tracing::warn!(
            "No reference images found under {}, writing an empty dataset",
            image_dir.display()
        );
        dataset::write_reference_set(source, &[], &[], extractor.dimension())?;
        return Ok(IngestReport {
            references: 0,
            skipped,
        });
    }

    let image_refs: Vec<&Path> = images.iter().map(PathBuf::as_path).collect();
    let embeddings = extractor.extract(&image_refs)?;
    if embeddings.len() != images.len() {
        return Err(MatcherError::ExtractionFailed(format!(
            "Extractor returned {} embeddings for {} images",
            embeddings.len(),
            images.len()
        ))
        .into());
    }

    let identifiers: Vec<String> = images
        .iter()
        .map(|path| path.to_string_lossy().into_owned())
        .collect();
    dataset::write_reference_set(source, &identifiers, &embeddings, extractor.dimension())?;

    tracing::info!(
        "Indexed {} reference images from {} ({} files skipped)",
        identifiers.len(),
        image_dir.display(),
        skipped
    );

    Ok(IngestReport {
        references: identifiers.len(),
        skipped,
    })
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
