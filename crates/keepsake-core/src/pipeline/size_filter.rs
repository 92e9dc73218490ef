//! Size ceiling stage.

use async_trait::async_trait;

use crate::config::LimitsConfig;
use crate::error::Result;
use crate::types::{MediaKind, StageKind, StageReport};

use super::stage::{discard, Stage, StageObserver, StageOutcome};
use super::working_set::WorkingSet;

/// Deletes images and videos above their byte ceilings.
///
/// A size that cannot be read counts as too large.
pub struct SizeFilter {
    max_image_bytes: u64,
    max_video_bytes: u64,
}

impl SizeFilter {
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            max_image_bytes: limits.max_image_bytes,
            max_video_bytes: limits.max_video_bytes,
        }
    }

    fn ceiling(&self, kind: MediaKind) -> u64 {
        match kind {
            MediaKind::Image => self.max_image_bytes,
            MediaKind::Video => self.max_video_bytes,
        }
    }
}

#[async_trait]
impl Stage for SizeFilter {
    fn kind(&self) -> StageKind {
        StageKind::SizeFilter
    }

    async fn run(&self, set: WorkingSet, observer: &dyn StageObserver) -> Result<StageOutcome> {
        let mut report = StageReport::new(self.kind(), set.len());
        observer.stage_started(self.kind(), set.len());

        let mut survivors = WorkingSet::new();
        for mut record in set {
            let ceiling = self.ceiling(record.kind);
            match record.refresh_size() {
                Ok(size) if size <= ceiling => {
                    survivors.push(record);
                }
                Ok(size) => {
                    let reason = format!("{} too large ({size} > {ceiling} bytes)", record.kind);
                    discard(&mut report, &record, reason, None);
                }
                Err(e) => {
                    discard(&mut report, &record, format!("unable to read size: {e}"), None);
                }
            }
            observer.record_finished(self.kind());
        }

        report.records_out = survivors.len();
        tracing::info!("{} large file(s) were removed", report.removed());
        observer.stage_finished(&report);
        Ok(StageOutcome {
            set: survivors,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stage::NoopObserver;
    use crate::types::MediaRecord;
    use std::path::Path;

    fn sized(dir: &Path, name: &str, len: usize, kind: MediaKind) -> MediaRecord {
        let path = dir.join(name);
        std::fs::write(&path, vec![0u8; len]).unwrap();
        MediaRecord::new(path, kind)
    }

    fn filter() -> SizeFilter {
        SizeFilter::new(&LimitsConfig {
            max_image_bytes: 100,
            max_video_bytes: 1000,
            ..LimitsConfig::default()
        })
    }

    #[tokio::test]
    async fn test_size_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let set: WorkingSet = vec![
            sized(dir.path(), "exact.jpg", 100, MediaKind::Image),
            sized(dir.path(), "over.jpg", 101, MediaKind::Image),
            sized(dir.path(), "exact.mp4", 1000, MediaKind::Video),
            sized(dir.path(), "over.mp4", 1001, MediaKind::Video),
            // Image-sized ceiling must not apply to videos
            sized(dir.path(), "small.mp4", 500, MediaKind::Video),
        ]
        .into_iter()
        .collect();

        let outcome = filter().run(set, &NoopObserver).await.unwrap();

        let kept: Vec<_> = outcome
            .set
            .iter()
            .map(|r| r.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(kept, vec!["exact.jpg", "exact.mp4", "small.mp4"]);
        assert!(!dir.path().join("over.jpg").exists());
        assert!(!dir.path().join("over.mp4").exists());
        assert_eq!(outcome.set.records()[0].size_bytes, Some(100));
        assert_eq!(outcome.report.removed(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = WorkingSet::new();
        set.push(MediaRecord::new(dir.path().join("ghost.jpg"), MediaKind::Image));

        let outcome = filter().run(set, &NoopObserver).await.unwrap();
        assert!(outcome.set.is_empty());
        assert!(outcome.report.events[0].reason.contains("unable to read size"));
    }
}
