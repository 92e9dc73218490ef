//! Perceptual hashing for near-duplicate detection.

use async_trait::async_trait;
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};
use std::path::Path;
use std::sync::Arc;

use crate::error::{PipelineError, PipelineResult};
use crate::types::Fingerprint;

/// Computes a fixed-width perceptual fingerprint for an image file.
#[async_trait]
pub trait HashEngine: Send + Sync {
    async fn fingerprint(&self, path: &Path) -> PipelineResult<Fingerprint>;
}

/// DCT mean hash (pHash) over a square grid.
///
/// The hasher is configured once and shared across images; a grid edge of
/// 8 yields a 64-bit fingerprint.
pub struct PerceptualHasher {
    hasher: Arc<image_hasher::Hasher>,
    bits: u32,
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new(8)
    }
}

impl PerceptualHasher {
    /// Create a hasher over a `hash_size × hash_size` grid.
    pub fn new(hash_size: u32) -> Self {
        let hasher = HasherConfig::new()
            .hash_alg(HashAlg::Mean)
            .preproc_dct()
            .hash_size(hash_size, hash_size)
            .to_hasher();
        Self {
            hasher: Arc::new(hasher),
            bits: hash_size * hash_size,
        }
    }

    /// Fingerprint an already decoded image.
    pub fn hash_image(&self, image: &DynamicImage) -> Fingerprint {
        Fingerprint::with_bit_len(self.hasher.hash_image(image).as_bytes(), self.bits)
    }

    fn hash_file_sync(
        hasher: &image_hasher::Hasher,
        bits: u32,
        path: &Path,
    ) -> PipelineResult<Fingerprint> {
        let image = image::ImageReader::open(path)
            .map_err(|e| PipelineError::io(path, e))?
            .with_guessed_format()
            .map_err(|e| PipelineError::io(path, e))?
            .decode()
            .map_err(|e| PipelineError::Hash {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(Fingerprint::with_bit_len(hasher.hash_image(&image).as_bytes(), bits))
    }
}

#[async_trait]
impl HashEngine for PerceptualHasher {
    async fn fingerprint(&self, path: &Path) -> PipelineResult<Fingerprint> {
        let hasher = Arc::clone(&self.hasher);
        let bits = self.bits;
        let path_owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::hash_file_sync(&hasher, bits, &path_owned))
            .await
            .map_err(|e| PipelineError::Hash {
                path: path.to_path_buf(),
                message: format!("Task join error: {e}"),
            })?
    }
}
