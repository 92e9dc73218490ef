//! Sub-configuration structs with defaults matching the documented behavior.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const MIB: u64 = 1024 * 1024;

/// Order in which collected files enter the working set.
///
/// The order drives the duplicate tie-break: the earliest file of a
/// similarity cluster is the one that survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionOrder {
    /// Sorted by full path (reproducible across filesystems)
    #[default]
    Path,
    /// Raw directory-walk order (platform dependent)
    Traversal,
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of records processed concurrently within a stage
    pub parallel_workers: usize,

    /// Extensions classified as images
    pub image_extensions: Vec<String>,

    /// Extensions classified as videos
    pub video_extensions: Vec<String>,

    /// Working-set order after collection
    pub collection_order: CollectionOrder,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 4,
            image_extensions: ["jpg", "jpeg", "png", "heic", "webp"]
                .map(String::from)
                .to_vec(),
            video_extensions: ["mp4", "avi", "mkv", "mov", "webm"]
                .map(String::from)
                .to_vec(),
            collection_order: CollectionOrder::Path,
        }
    }
}

/// Size ceilings, quality floors and per-stage timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest image kept, in bytes (inclusive)
    pub max_image_bytes: u64,

    /// Largest video kept, in bytes (inclusive)
    pub max_video_bytes: u64,

    /// Minimum image width in pixels (inclusive)
    pub min_image_width: u32,

    /// Minimum image height in pixels (inclusive)
    pub min_image_height: u32,

    /// Minimum video width in pixels (inclusive)
    pub min_video_width: u32,

    /// Minimum video height in pixels (inclusive)
    pub min_video_height: u32,

    /// Inspector timeout during validation, in milliseconds
    pub validate_timeout_ms: u64,

    /// Inspector timeout during the quality check, in milliseconds
    pub quality_timeout_ms: u64,

    /// Image conversion timeout in milliseconds
    pub image_convert_timeout_ms: u64,

    /// Video conversion timeout in milliseconds
    pub video_convert_timeout_ms: u64,

    /// Perceptual hash timeout in milliseconds
    pub hash_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: 20 * MIB,
            max_video_bytes: 1024 * MIB,
            min_image_width: 600,
            min_image_height: 400,
            min_video_width: 600,
            min_video_height: 400,
            validate_timeout_ms: 5_000,
            quality_timeout_ms: 10_000,
            image_convert_timeout_ms: 60_000,
            video_convert_timeout_ms: 600_000,
            hash_timeout_ms: 10_000,
        }
    }
}

impl LimitsConfig {
    pub fn validate_timeout(&self) -> Duration {
        Duration::from_millis(self.validate_timeout_ms)
    }

    pub fn quality_timeout(&self) -> Duration {
        Duration::from_millis(self.quality_timeout_ms)
    }

    pub fn image_convert_timeout(&self) -> Duration {
        Duration::from_millis(self.image_convert_timeout_ms)
    }

    pub fn video_convert_timeout(&self) -> Duration {
        Duration::from_millis(self.video_convert_timeout_ms)
    }

    pub fn hash_timeout(&self) -> Duration {
        Duration::from_millis(self.hash_timeout_ms)
    }
}

/// Which containers get converted to the canonical formats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Image extensions converted to PNG
    pub image_sources: Vec<String>,

    /// Video extensions converted to MP4 (H.264/AAC)
    pub video_sources: Vec<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            image_sources: ["heic", "webp"].map(String::from).to_vec(),
            video_sources: ["avi", "mkv", "mov", "webm"].map(String::from).to_vec(),
        }
    }
}

/// How a Hamming distance is turned into a similarity percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    /// `(1 - distance / edge²) * 100`, where `edge` is the side of the
    /// square hash grid. This is the historical arithmetic; for a square
    /// grid `edge²` is the bit count, so it agrees with `Normalized`.
    #[default]
    Legacy,
    /// `(1 - distance / bits) * 100`
    Normalized,
}

impl SimilarityMetric {
    /// Similarity percentage for a distance between two `bits`-wide hashes.
    pub fn similarity(self, distance: u32, bits: u32) -> f64 {
        let denominator = match self {
            SimilarityMetric::Legacy => {
                let edge = f64::from(bits).sqrt().floor();
                edge * edge
            }
            SimilarityMetric::Normalized => f64::from(bits),
        };
        if denominator == 0.0 {
            return 0.0;
        }
        (1.0 - f64::from(distance) / denominator) * 100.0
    }
}

/// Near-duplicate detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Similarity percentage at or above which two images are duplicates
    pub threshold_percent: f64,

    /// Distance-to-similarity conversion
    pub similarity: SimilarityMetric,

    /// Hash grid edge; the fingerprint is `hash_size²` bits wide
    pub hash_size: u32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            threshold_percent: 95.0,
            similarity: SimilarityMetric::Legacy,
            hash_size: 8,
        }
    }
}

/// Target tree settings for the chronological copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizeConfig {
    /// Root of the organized archive (supports `~`)
    pub output_dir: PathBuf,

    /// Directory name for images under `output_dir`
    pub photos_dir: String,

    /// Directory name for videos under `output_dir`
    pub videos_dir: String,

    /// Ask before copying (honored by the CLI, never by the library)
    pub confirm_before_write: bool,

    /// Carry the source modification time over to the copy
    pub preserve_mtime: bool,
}

impl Default for OrganizeConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("~/Memories"),
            photos_dir: "Photos".to_string(),
            videos_dir: "Videos".to_string(),
            confirm_before_write: true,
            preserve_mtime: true,
        }
    }
}

/// External tool locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// ffprobe executable name or path
    pub ffprobe: String,

    /// ffmpeg executable name or path
    pub ffmpeg: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffprobe: "ffprobe".to_string(),
            ffmpeg: "ffmpeg".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
