//! Core data types for the Keepsake curation pipeline.
//!
//! `MediaRecord` represents one candidate file while it moves through the
//! stages; the report types describe what each stage did to the records.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Broad media category, fixed from the extension at collection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Pixel or frame dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when both axes reach the given minimum (inclusive).
    pub fn meets(&self, min_width: u32, min_height: u32) -> bool {
        self.width >= min_width && self.height >= min_height
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Fixed-width perceptual fingerprint.
///
/// Bits are packed into bytes; when the width is not a multiple of 8 the
/// trailing padding bits are not counted in [`Fingerprint::bit_len`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    bytes: Vec<u8>,
    bits: u32,
}

impl Fingerprint {
    /// Fingerprint using every bit of `bytes`.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let bits = (bytes.len() * 8) as u32;
        Self { bytes, bits }
    }

    /// Fingerprint whose meaningful width is `bits`, capped at the bytes given.
    pub fn with_bit_len(bytes: impl Into<Vec<u8>>, bits: u32) -> Self {
        let bytes = bytes.into();
        let bits = bits.min((bytes.len() * 8) as u32);
        Self { bytes, bits }
    }

    /// Width of the fingerprint in bits.
    pub fn bit_len(&self) -> u32 {
        self.bits
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hamming distance to another fingerprint.
    ///
    /// Bytes present in only one of the two (mismatched widths) count as
    /// fully different.
    pub fn distance(&self, other: &Fingerprint) -> u32 {
        let shared: u32 = self
            .bytes
            .iter()
            .zip(&other.bytes)
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        let unmatched = self.bytes.len().abs_diff(other.bytes.len()) as u32 * 8;
        shared + unmatched
    }
}

/// One candidate file moving through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct MediaRecord {
    /// Current location; rewritten when a conversion replaces the file
    pub path: PathBuf,

    /// Category from the original extension; never changes
    pub kind: MediaKind,

    /// Size in bytes as of the last refresh
    pub size_bytes: Option<u64>,

    /// Dimensions reported by the inspector, reset when the file is replaced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,

    /// Modification time, read by the organizer only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_timestamp: Option<DateTime<Local>>,

    /// Perceptual hash, alive only inside duplicate detection
    #[serde(skip)]
    pub fingerprint: Option<Fingerprint>,
}

impl MediaRecord {
    pub fn new(path: impl Into<PathBuf>, kind: MediaKind) -> Self {
        Self {
            path: path.into(),
            kind,
            size_bytes: None,
            dimensions: None,
            capture_timestamp: None,
            fingerprint: None,
        }
    }

    /// Lowercase extension of the current path.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.path)
    }

    /// Re-read the size of the file at the current path.
    pub fn refresh_size(&mut self) -> std::io::Result<u64> {
        let len = std::fs::metadata(&self.path)?.len();
        self.size_bytes = Some(len);
        Ok(len)
    }

    /// Point the record at a replacement file, dropping stale derived data.
    pub fn replace_path(&mut self, path: PathBuf) {
        self.path = path;
        self.size_bytes = None;
        self.dimensions = None;
    }
}

/// Lowercase extension of a path, if any.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// The pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Validate,
    SizeFilter,
    Normalize,
    QualityFilter,
    Deduplicate,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Validate => "validate",
            StageKind::SizeFilter => "size_filter",
            StageKind::Normalize => "normalize",
            StageKind::QualityFilter => "quality_filter",
            StageKind::Deduplicate => "deduplicate",
        }
    }

    /// Human label for progress output.
    pub fn label(&self) -> &'static str {
        match self {
            StageKind::Validate => "Validating files",
            StageKind::SizeFilter => "Removing large files",
            StageKind::Normalize => "Converting files",
            StageKind::QualityFilter => "Removing low-quality files",
            StageKind::Deduplicate => "Removing duplicates",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage did with one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordAction {
    /// Deleted from disk and dropped from the working set
    Removed,
    /// Dropped from the working set, but the delete call failed
    DroppedUndeleted,
    /// Replaced by a converted file
    Converted,
    /// Left untouched after a non-fatal failure
    PassedThrough,
}

/// A single disposition, with the reason behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordEvent {
    pub stage: StageKind,
    pub path: PathBuf,
    pub action: RecordAction,
    pub reason: String,
    /// Replacement path for conversions, kept representative for duplicates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<PathBuf>,
}

/// Outcome summary of one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: StageKind,
    pub records_in: usize,
    pub records_out: usize,
    pub events: Vec<RecordEvent>,
}

impl StageReport {
    pub fn new(stage: StageKind, records_in: usize) -> Self {
        Self {
            stage,
            records_in,
            records_out: records_in,
            events: Vec::new(),
        }
    }

    /// Records dropped from the working set (deleted or not).
    pub fn removed(&self) -> usize {
        self.count(RecordAction::Removed) + self.count(RecordAction::DroppedUndeleted)
    }

    pub fn converted(&self) -> usize {
        self.count(RecordAction::Converted)
    }

    pub fn passed_through(&self) -> usize {
        self.count(RecordAction::PassedThrough)
    }

    pub fn count(&self, action: RecordAction) -> usize {
        self.events.iter().filter(|e| e.action == action).count()
    }

    pub(crate) fn push(
        &mut self,
        path: &Path,
        action: RecordAction,
        reason: impl Into<String>,
        related: Option<PathBuf>,
    ) {
        self.events.push(RecordEvent {
            stage: self.stage,
            path: path.to_path_buf(),
            action,
            reason: reason.into(),
            related,
        });
    }
}

/// Aggregated outcome of the filtering stages.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CurationReport {
    /// Records present right after collection
    pub collected: usize,

    /// One report per stage, in execution order
    pub stages: Vec<StageReport>,

    /// Records that survived every stage
    pub survivors: usize,
}

impl CurationReport {
    pub fn stage(&self, stage: StageKind) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// All record events across stages, in execution order.
    pub fn events(&self) -> impl Iterator<Item = &RecordEvent> {
        self.stages.iter().flat_map(|s| s.events.iter())
    }
}

/// Outcome of the chronological copy.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrganizeReport {
    /// Files copied into the archive
    pub copied: usize,

    /// Copies that needed a numeric suffix to avoid a collision
    pub renamed: usize,

    /// Files that could not be copied, with the error
    pub failed: Vec<(PathBuf, String)>,

    /// Month directories that were created or reused
    pub directories: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_distance() {
        let a = Fingerprint::from_bytes(vec![0b1111_0000, 0x00]);
        let b = Fingerprint::from_bytes(vec![0b1111_1111, 0x01]);
        assert_eq!(a.bit_len(), 16);
        assert_eq!(a.distance(&b), 5);
        assert_eq!(b.distance(&a), 5);
        assert_eq!(a.distance(&a), 0);
    }

    #[test]
    fn test_fingerprint_distance_mismatched_width() {
        let a = Fingerprint::from_bytes(vec![0xFF]);
        let b = Fingerprint::from_bytes(vec![0xFF, 0x00]);
        assert_eq!(a.distance(&b), 8);
    }

    #[test]
    fn test_fingerprint_width_excludes_padding() {
        // 5x5 grid: 25 bits packed into 4 bytes
        let fp = Fingerprint::with_bit_len(vec![0xFF, 0xFF, 0xFF, 0x80], 25);
        assert_eq!(fp.bit_len(), 25);
        assert_eq!(fp.as_bytes().len(), 4);

        let capped = Fingerprint::with_bit_len(vec![0xFF], 64);
        assert_eq!(capped.bit_len(), 8);
    }

    #[test]
    fn test_dimensions_meets_is_inclusive() {
        assert!(Dimensions::new(600, 400).meets(600, 400));
        assert!(!Dimensions::new(599, 400).meets(600, 400));
        assert!(!Dimensions::new(600, 399).meets(600, 400));
    }

    #[test]
    fn test_replace_path_drops_derived_data() {
        let mut record = MediaRecord::new("/photos/a.webp", MediaKind::Image);
        record.size_bytes = Some(10);
        record.dimensions = Some(Dimensions::new(800, 600));
        record.replace_path(PathBuf::from("/photos/a.png"));
        assert_eq!(record.kind, MediaKind::Image);
        assert!(record.size_bytes.is_none());
        assert!(record.dimensions.is_none());
        assert_eq!(record.extension().as_deref(), Some("png"));
    }

    #[test]
    fn test_stage_report_counts() {
        let mut report = StageReport::new(StageKind::SizeFilter, 3);
        report.push(Path::new("a.jpg"), RecordAction::Removed, "too large", None);
        report.push(
            Path::new("b.jpg"),
            RecordAction::DroppedUndeleted,
            "too large",
            None,
        );
        assert_eq!(report.removed(), 2);
        assert_eq!(report.converted(), 0);

        let json = serde_json::to_string(&report.events[1]).unwrap();
        assert!(json.contains("\"action\":\"dropped_undeleted\""));
        assert!(json.contains("\"stage\":\"size_filter\""));
        assert!(!json.contains("related"));
    }
}
