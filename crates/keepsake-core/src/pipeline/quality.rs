//! Quality stage: delete media below the minimum resolution.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LimitsConfig;
use crate::error::Result;
use crate::types::{Dimensions, MediaKind, MediaRecord, StageKind, StageReport};

use super::inspect::{Inspection, MediaInspector};
use super::stage::{bounded, discard, evaluate, Stage, StageObserver, StageOutcome};
use super::working_set::WorkingSet;

enum Verdict {
    Keep(Option<Dimensions>),
    Reject(String),
}

/// Rejects images and videos smaller than the configured minimum.
///
/// Videos with no video stream, or whose metadata cannot be parsed, are
/// rejected too. Images the decoder cannot measure (kept pass-through
/// formats) stay.
pub struct QualityFilter {
    inspector: Arc<dyn MediaInspector>,
    min_image: (u32, u32),
    min_video: (u32, u32),
    timeout: Duration,
    workers: usize,
}

impl QualityFilter {
    pub fn new(inspector: Arc<dyn MediaInspector>, limits: &LimitsConfig, workers: usize) -> Self {
        Self {
            inspector,
            min_image: (limits.min_image_width, limits.min_image_height),
            min_video: (limits.min_video_width, limits.min_video_height),
            timeout: limits.quality_timeout(),
            workers,
        }
    }

    fn judge(&self, record: &MediaRecord, inspection: Inspection) -> Verdict {
        if !inspection.valid {
            let why = inspection.diagnostic.unwrap_or_default();
            return Verdict::Reject(format!("unable to analyze {}: {why}", record.kind));
        }

        let (min_w, min_h) = match record.kind {
            MediaKind::Image => self.min_image,
            MediaKind::Video => self.min_video,
        };

        match (record.kind, inspection.dimensions) {
            (MediaKind::Video, _) if inspection.has_video_stream.is_none() => {
                Verdict::Reject("unable to analyze video".to_string())
            }
            (MediaKind::Video, _) if inspection.has_video_stream == Some(false) => {
                Verdict::Reject("no video stream found".to_string())
            }
            (_, Some(dims)) if dims.meets(min_w, min_h) => Verdict::Keep(Some(dims)),
            (_, Some(dims)) => Verdict::Reject(format!(
                "dimensions too small ({dims} < {min_w}x{min_h})"
            )),
            (MediaKind::Video, None) => Verdict::Reject("unable to analyze video".to_string()),
            (MediaKind::Image, None) => {
                tracing::debug!("No dimensions for {:?}, keeping it", record.path);
                Verdict::Keep(None)
            }
        }
    }
}

#[async_trait]
impl Stage for QualityFilter {
    fn kind(&self) -> StageKind {
        StageKind::QualityFilter
    }

    async fn run(&self, set: WorkingSet, observer: &dyn StageObserver) -> Result<StageOutcome> {
        let mut report = StageReport::new(self.kind(), set.len());
        observer.stage_started(self.kind(), set.len());

        let inspections = evaluate(
            set.records(),
            self.workers,
            self.kind(),
            observer,
            |record| {
                let inspector = Arc::clone(&self.inspector);
                let path = record.path.clone();
                let kind = record.kind;
                let timeout = self.timeout;
                async move {
                    bounded(StageKind::QualityFilter, &path, timeout, async {
                        Ok(inspector.inspect(&path, kind).await)
                    })
                    .await
                    .unwrap_or_else(|e| Inspection::invalid(e.to_string()))
                }
            },
        )
        .await;

        let mut survivors = WorkingSet::new();
        for (mut record, inspection) in set.into_iter().zip(inspections) {
            match self.judge(&record, inspection) {
                Verdict::Keep(dimensions) => {
                    record.dimensions = dimensions;
                    survivors.push(record);
                }
                Verdict::Reject(reason) => discard(&mut report, &record, reason, None),
            }
        }

        report.records_out = survivors.len();
        tracing::info!("{} low-quality file(s) were removed", report.removed());
        observer.stage_finished(&report);
        Ok(StageOutcome {
            set: survivors,
            report,
        })
    }
}
