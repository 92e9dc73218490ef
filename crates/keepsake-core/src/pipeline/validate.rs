//! Validation stage: delete every file the inspector cannot decode.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{CollectionError, Result};
use crate::types::{StageKind, StageReport};

use super::inspect::{Inspection, MediaInspector};
use super::stage::{bounded, discard, evaluate, Stage, StageObserver, StageOutcome};
use super::working_set::WorkingSet;

/// Best-effort structural check of every record.
///
/// Inspector failures, timeouts and crashes all disqualify only the record
/// they happened on.
pub struct ValidateStage {
    inspector: Arc<dyn MediaInspector>,
    /// Collection root, named when there is nothing to validate
    root: PathBuf,
    timeout: Duration,
    workers: usize,
}

impl ValidateStage {
    pub fn new(
        inspector: Arc<dyn MediaInspector>,
        root: impl Into<PathBuf>,
        timeout: Duration,
        workers: usize,
    ) -> Self {
        Self {
            inspector,
            root: root.into(),
            timeout,
            workers,
        }
    }
}

#[async_trait]
impl Stage for ValidateStage {
    fn kind(&self) -> StageKind {
        StageKind::Validate
    }

    async fn run(&self, set: WorkingSet, observer: &dyn StageObserver) -> Result<StageOutcome> {
        // Checked once, before any file I/O.
        if set.is_empty() {
            return Err(CollectionError::EmptyCollection {
                path: self.root.clone(),
            }
            .into());
        }

        let mut report = StageReport::new(self.kind(), set.len());
        observer.stage_started(self.kind(), set.len());

        let verdicts = evaluate(
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
                    let result = bounded(StageKind::Validate, &path, timeout, async {
                        Ok(inspector.inspect(&path, kind).await)
                    })
                    .await;
                    match result {
                        Ok(inspection) => inspection,
                        Err(e) => Inspection::invalid(e.to_string()),
                    }
                }
            },
        )
        .await;

        let mut survivors = WorkingSet::new();
        for (record, inspection) in set.into_iter().zip(verdicts) {
            if inspection.valid {
                survivors.push(record);
            } else {
                let reason = inspection
                    .diagnostic
                    .unwrap_or_else(|| "not decodable".to_string());
                discard(&mut report, &record, format!("corrupt: {reason}"), None);
            }
        }

        report.records_out = survivors.len();
        tracing::info!(
            "Validation removed {} corrupt file(s), {} remain",
            report.removed(),
            survivors.len()
        );
        observer.stage_finished(&report);
        Ok(StageOutcome {
            set: survivors,
            report,
        })
    }
}
