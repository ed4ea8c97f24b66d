//! Feature extraction seam between the matcher and its upstream producer.
//!
//! The store treats embeddings as opaque numeric vectors; this module owns
//! the contract for producing them from images. The shipped implementation
//! uses fastembed's CLIP ViT-B/32 vision model (512 dimensions); ResNet-50
//! (2048 dimensions) remains selectable through configuration for datasets
//! built with it.

use std::path::Path;
use std::sync::Mutex;

use fastembed::{ImageEmbedding, ImageEmbeddingModel, ImageInitOptions};

use crate::config::ExtractorConfig;
use crate::matcher::types::{EmbeddingDimension, MatcherError};

/// Trait for producing image embeddings.
///
/// Implementations must be thread-safe and should handle batches
/// efficiently; the ingest pipeline hands over every reference image in
/// one call.
pub trait FeatureExtractor: Send + Sync {
    /// Extracts one embedding per input image, in input order.
    fn extract(&self, images: &[&Path]) -> Result<Vec<Vec<f32>>, MatcherError>;

    /// Returns the dimension of embeddings produced by this extractor.
    #[must_use]
    fn dimension(&self) -> EmbeddingDimension;
}

/// fastembed-backed image feature extractor.
///
/// Defaults to CLIP ViT-B/32, which produces 512-dimensional embeddings
/// suited to cross-image visual similarity.
pub struct ClipFeatureExtractor {
    model: Mutex<ImageEmbedding>,
    dimension: EmbeddingDimension,
}

impl ClipFeatureExtractor {
    /// Creates an extractor with the default configuration.
    ///
    /// # Errors
    /// Returns an error if the model fails to initialize or download.
    pub fn new() -> Result<Self, MatcherError> {
        Self::with_config(&ExtractorConfig::default())
    }

    /// Creates an extractor from explicit configuration.
    ///
    /// # Errors
    /// Returns an error if the model name is unknown or the model fails to
    /// initialize or download.
    pub fn with_config(config: &ExtractorConfig) -> Result<Self, MatcherError> {
        let (model_name, dimension) = parse_image_model(&config.model).ok_or_else(|| {
            MatcherError::ExtractionFailed(format!(
                "Unknown image embedding model '{}'. Supported: clip-vit-b-32, resnet50",
                config.model
            ))
        })?;

        let mut options = ImageInitOptions::new(model_name)
            .with_show_download_progress(config.show_download_progress);
        if let Some(cache_dir) = &config.cache_dir {
            options = options.with_cache_dir(cache_dir.clone());
        }

        let model = ImageEmbedding::try_new(options).map_err(|e| {
            MatcherError::ExtractionFailed(format!(
                "Failed to initialize image embedding model: {e}. Ensure you have internet connection for first-time model download"
            ))
        })?;

        Ok(Self {
            model: Mutex::new(model),
            dimension,
        })
    }
}

impl FeatureExtractor for ClipFeatureExtractor {
    fn extract(&self, images: &[&Path]) -> Result<Vec<Vec<f32>>, MatcherError> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self
            .model
            .lock()
            .map_err(|_| {
                MatcherError::ExtractionFailed(
                    "Failed to acquire embedding model lock - model may be poisoned".to_string(),
                )
            })?
            .embed(images.to_vec(), None)
            .map_err(|e| {
                MatcherError::ExtractionFailed(format!("Failed to embed images: {e}"))
            })?;

        // Validate dimensions
        for embedding in &embeddings {
            if embedding.len() != self.dimension.get() {
                return Err(MatcherError::DimensionMismatch {
                    expected: self.dimension.get(),
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> EmbeddingDimension {
        self.dimension
    }
}

/// Maps a configured model name to its fastembed model and dimension.
fn parse_image_model(name: &str) -> Option<(ImageEmbeddingModel, EmbeddingDimension)> {
    match name {
        "clip-vit-b-32" => Some((
            ImageEmbeddingModel::ClipVitB32,
            EmbeddingDimension::dimension_512(),
        )),
        "resnet50" => Some((
            ImageEmbeddingModel::Resnet50,
            EmbeddingDimension::new(2048).expect("2048 is a valid dimension"),
        )),
        _ => None,
    }
}

/// Mock feature extractor for testing.
///
/// Produces deterministic, unit-normalized embeddings derived from each
/// image's file name, so tests can assert on ranking without a model
/// download.
#[cfg(test)]
pub struct MockFeatureExtractor {
    dimension: EmbeddingDimension,
}

#[cfg(test)]
impl Default for MockFeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl MockFeatureExtractor {
    /// Creates a mock with the standard 512 dimensions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dimension: EmbeddingDimension::dimension_512(),
        }
    }

    /// Creates a mock with a custom dimension for testing.
    #[must_use]
    pub fn with_dimension(dimension: EmbeddingDimension) -> Self {
        Self { dimension }
    }
}

#[cfg(test)]
impl FeatureExtractor for MockFeatureExtractor {
    fn extract(&self, images: &[&Path]) -> Result<Vec<Vec<f32>>, MatcherError> {
        let dim = self.dimension.get();
        let mut embeddings = Vec::with_capacity(images.len());

        for image in images {
            let mut embedding = vec![0.1; dim];

            // Spread the file name bytes over the vector so distinct names
            // produce distinct directions.
            let name = image
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            for (i, byte) in name.bytes().enumerate() {
                embedding[i % dim] += f32::from(byte) / 255.0;
            }

            // Normalize to unit length (like real embeddings)
            let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            if magnitude > 0.0 {
                for val in &mut embedding {
                    *val /= magnitude;
                }
            }

            embeddings.push(embedding);
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> EmbeddingDimension {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_mock_extractor_dimensions() {
        let extractor = MockFeatureExtractor::new();
        let paths = [PathBuf::from("poster_a.jpg"), PathBuf::from("poster_b.jpg")];
        let refs: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();

        let embeddings = extractor.extract(&refs).unwrap();
        assert_eq!(embeddings.len(), 2);
        for embedding in &embeddings {
            assert_eq!(embedding.len(), 512);
        }
    }

    #[test]
    fn test_mock_embeddings_are_normalized() {
        let extractor = MockFeatureExtractor::with_dimension(EmbeddingDimension::new(8).unwrap());
        let path = PathBuf::from("suspense1.jpg");

        let embeddings = extractor.extract(&[path.as_path()]).unwrap();
        let magnitude: f32 = embeddings[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_mock_embeddings_are_deterministic() {
        let extractor = MockFeatureExtractor::new();
        let path = PathBuf::from("happy1.jpg");

        let first = extractor.extract(&[path.as_path()]).unwrap();
        let second = extractor.extract(&[path.as_path()]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_mock_distinguishes_file_names() {
        let extractor = MockFeatureExtractor::new();
        let a = PathBuf::from("happy1.jpg");
        let b = PathBuf::from("sad1.jpg");

        let embeddings = extractor.extract(&[a.as_path(), b.as_path()]).unwrap();
        assert_ne!(embeddings[0], embeddings[1]);
    }

    #[test]
    fn test_known_models_parse() {
        let (_, clip_dim) = parse_image_model("clip-vit-b-32").unwrap();
        assert_eq!(clip_dim.get(), 512);

        let (_, resnet_dim) = parse_image_model("resnet50").unwrap();
        assert_eq!(resnet_dim.get(), 2048);

        assert!(parse_image_model("vgg16").is_none());
    }

    #[test]
    fn test_empty_batch_is_a_no_op() {
        let extractor = MockFeatureExtractor::new();
        assert!(extractor.extract(&[]).unwrap().is_empty());
    }
}
