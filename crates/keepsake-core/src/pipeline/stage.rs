//! Stage contract shared by every filter: consume a working set, return the
//! surviving sub-selection plus a report.

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PipelineError, PipelineResult, Result};
use crate::types::{MediaRecord, RecordAction, StageKind, StageReport};

use super::working_set::WorkingSet;

/// Result of running one stage.
#[derive(Debug)]
pub struct StageOutcome {
    pub set: WorkingSet,
    pub report: StageReport,
}

/// A destructive `WorkingSet -> WorkingSet` transformation.
///
/// On return every record in `set` points at a file that exists, and every
/// record that was dropped has had its file deletion attempted exactly once.
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    async fn run(&self, set: WorkingSet, observer: &dyn StageObserver) -> Result<StageOutcome>;
}

/// Progress hooks. All methods default to no-ops.
pub trait StageObserver: Send + Sync {
    fn stage_started(&self, _stage: StageKind, _total: usize) {}

    fn record_finished(&self, _stage: StageKind) {}

    fn stage_finished(&self, _report: &StageReport) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {}

/// Run `check` over every record on a bounded pool of `workers` concurrent
/// futures. Results come back in record order.
pub(crate) async fn evaluate<'a, F, Fut, V>(
    records: &'a [MediaRecord],
    workers: usize,
    stage: StageKind,
    observer: &'a dyn StageObserver,
    mut check: F,
) -> Vec<V>
where
    F: FnMut(&'a MediaRecord) -> Fut + Send,
    Fut: Future<Output = V> + Send + 'a,
    V: Send,
{
    stream::iter(records)
        .map(move |record| {
            let fut = check(record);
            async move {
                let verdict = fut.await;
                observer.record_finished(stage);
                verdict
            }
        })
        .buffered(workers.max(1))
        .boxed()
        .collect()
        .await
}

/// Bound a collaborator call by `limit`; expiry becomes a `Timeout` error.
pub(crate) async fn bounded<T, Fut>(
    stage: StageKind,
    path: &Path,
    limit: Duration,
    fut: Fut,
) -> PipelineResult<T>
where
    Fut: Future<Output = PipelineResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(PipelineError::Timeout {
            path: path.to_path_buf(),
            stage: stage.to_string(),
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}

/// Delete a rejected record's file and log the disposition.
///
/// Fail-open: whatever the delete call returns, the caller drops the record.
/// A file that is already gone counts as removed.
pub(crate) fn discard(
    report: &mut StageReport,
    record: &MediaRecord,
    reason: impl Into<String>,
    related: Option<PathBuf>,
) {
    let reason = reason.into();
    let action = match std::fs::remove_file(&record.path) {
        Ok(()) => RecordAction::Removed,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("{:?} was already gone", record.path);
            RecordAction::Removed
        }
        Err(e) => {
            tracing::warn!(
                "Failed to delete {:?} ({}): {} - dropping it anyway",
                record.path,
                reason,
                e
            );
            RecordAction::DroppedUndeleted
        }
    };
    tracing::debug!("[{}] removed {:?}: {}", report.stage, record.path, reason);
    report.push(&record.path, action, reason, related);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingObserver {
        finished: AtomicUsize,
    }

    impl StageObserver for CountingObserver {
        fn record_finished(&self, _stage: StageKind) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_evaluate_preserves_order_under_concurrency() {
        let records: Vec<MediaRecord> = (0..8)
            .map(|i| MediaRecord::new(format!("/{i}.jpg"), MediaKind::Image))
            .collect();
        let observer = CountingObserver::default();

        // Earlier records sleep longer so they finish last.
        let out = evaluate(&records, 4, StageKind::Validate, &observer, |record| {
            let index: u64 = record
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse().ok())
                .unwrap();
            let delay = (8 - index) * 5;
            let path = record.path.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                path
            }
        })
        .await;

        let expected: Vec<PathBuf> = records.iter().map(|r| r.path.clone()).collect();
        assert_eq!(out, expected);
        assert_eq!(observer.finished.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: PipelineResult<()> = bounded(
            StageKind::Normalize,
            Path::new("slow.mov"),
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
        )
        .await;

        match result {
            Err(PipelineError::Timeout {
                stage, timeout_ms, ..
            }) => {
                assert_eq!(stage, "normalize");
                assert_eq!(timeout_ms, 10);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_discard_deletes_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.jpg");
        std::fs::write(&present, b"x").unwrap();

        let mut report = StageReport::new(StageKind::SizeFilter, 2);
        discard(
            &mut report,
            &MediaRecord::new(&present, MediaKind::Image),
            "too large",
            None,
        );
        discard(
            &mut report,
            &MediaRecord::new(dir.path().join("missing.jpg"), MediaKind::Image),
            "too large",
            None,
        );

        assert!(!present.exists());
        assert_eq!(report.count(RecordAction::Removed), 2);
    }
}
