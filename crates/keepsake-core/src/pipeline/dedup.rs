//! Near-duplicate image removal.
//!
//! Clustering is greedy and single-pass over collection order: each
//! unresolved image becomes a representative and deletes every later,
//! unresolved image that is similar enough. A deleted image never
//! represents a cluster of its own, so similarity is not transitive: if
//! A absorbs B, a C that only resembles B is still judged against A alone.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{DedupConfig, SimilarityMetric};
use crate::error::Result;
use crate::types::{Fingerprint, MediaKind, RecordAction, StageKind, StageReport};

use super::hash::HashEngine;
use super::stage::{bounded, discard, evaluate, Stage, StageObserver, StageOutcome};
use super::working_set::WorkingSet;

/// A duplicate found by [`cluster`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuplicateMatch {
    /// Index of the deleted fingerprint
    pub duplicate: usize,
    /// Index of the representative that absorbed it
    pub representative: usize,
    /// Similarity percentage that triggered the match
    pub similarity: f64,
}

/// Kept/deleted split of a fingerprint sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    /// Representatives, ascending
    pub kept: Vec<usize>,
    /// Deleted indices in the order they were resolved
    pub duplicates: Vec<DuplicateMatch>,
}

/// Partition `fingerprints` (in collection order) into representatives and
/// duplicates.
///
/// The result is a pure function of order, fingerprints, threshold and
/// metric. Cost is O(n²) distance computations in the worst case.
pub fn cluster(fingerprints: &[Fingerprint], threshold: f64, metric: SimilarityMetric) -> Partition {
    let n = fingerprints.len();
    let mut resolved = vec![false; n];
    let mut partition = Partition::default();

    for i in 0..n {
        if resolved[i] {
            continue;
        }
        let bits = fingerprints[i].bit_len();
        for j in (i + 1)..n {
            if resolved[j] {
                continue;
            }
            let distance = fingerprints[i].distance(&fingerprints[j]);
            let similarity = metric.similarity(distance, bits);
            if similarity >= threshold {
                resolved[j] = true;
                partition.duplicates.push(DuplicateMatch {
                    duplicate: j,
                    representative: i,
                    similarity,
                });
            }
        }
        resolved[i] = true;
        partition.kept.push(i);
    }

    partition
}

/// Stage that deletes near-duplicate images, keeping the earliest of each
/// cluster. Videos pass through untouched.
pub struct DuplicateDetector {
    hasher: Arc<dyn HashEngine>,
    threshold: f64,
    metric: SimilarityMetric,
    timeout: Duration,
    workers: usize,
}

impl DuplicateDetector {
    pub fn new(
        hasher: Arc<dyn HashEngine>,
        config: &DedupConfig,
        timeout: Duration,
        workers: usize,
    ) -> Self {
        Self {
            hasher,
            threshold: config.threshold_percent,
            metric: config.similarity,
            timeout,
            workers,
        }
    }
}

#[async_trait]
impl Stage for DuplicateDetector {
    fn kind(&self) -> StageKind {
        StageKind::Deduplicate
    }

    async fn run(&self, set: WorkingSet, observer: &dyn StageObserver) -> Result<StageOutcome> {
        let mut report = StageReport::new(self.kind(), set.len());
        observer.stage_started(self.kind(), set.len());

        let hashes = evaluate(
            set.records(),
            self.workers,
            self.kind(),
            observer,
            |record| {
                let hasher = Arc::clone(&self.hasher);
                let path = record.path.clone();
                let is_image = record.kind == MediaKind::Image;
                let timeout = self.timeout;
                async move {
                    if !is_image {
                        return None;
                    }
                    Some(
                        bounded(StageKind::Deduplicate, &path, timeout, hasher.fingerprint(&path))
                            .await,
                    )
                }
            },
        )
        .await;

        let mut records = set.into_records();
        // Position in `fingerprints` -> position in `records`
        let mut owners = Vec::new();
        let mut fingerprints = Vec::new();
        for (index, (record, hash)) in records.iter_mut().zip(hashes).enumerate() {
            match hash {
                Some(Ok(fingerprint)) => {
                    record.fingerprint = Some(fingerprint.clone());
                    owners.push(index);
                    fingerprints.push(fingerprint);
                }
                Some(Err(e)) => {
                    tracing::warn!("Cannot hash {:?}, keeping it: {}", record.path, e);
                    report.push(
                        &record.path,
                        RecordAction::PassedThrough,
                        format!("hashing failed: {e}"),
                        None,
                    );
                }
                None => {}
            }
        }

        let partition = cluster(&fingerprints, self.threshold, self.metric);
        tracing::debug!(
            "Compared {} image(s): {} kept, {} duplicate(s)",
            fingerprints.len(),
            partition.kept.len(),
            partition.duplicates.len()
        );

        let doomed: HashMap<usize, (PathBuf, f64)> = partition
            .duplicates
            .iter()
            .map(|m| {
                let keeper = records[owners[m.representative]].path.clone();
                (owners[m.duplicate], (keeper, m.similarity))
            })
            .collect();

        let mut survivors = WorkingSet::new();
        for (index, mut record) in records.into_iter().enumerate() {
            match doomed.get(&index) {
                Some((keeper, similarity)) => {
                    let reason = format!(
                        "duplicate of {} ({similarity:.2}% similar)",
                        keeper.display()
                    );
                    discard(&mut report, &record, reason, Some(keeper.clone()));
                }
                None => {
                    record.fingerprint = None;
                    survivors.push(record);
                }
            }
        }

        report.records_out = survivors.len();
        tracing::info!("{} duplicate image(s) were removed", report.removed());
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
    use crate::error::{PipelineError, PipelineResult};
    use crate::pipeline::stage::NoopObserver;
    use crate::types::MediaRecord;
    use std::path::Path;

    fn fp(value: u64) -> Fingerprint {
        Fingerprint::from_bytes(value.to_be_bytes().to_vec())
    }

    /// Value with the lowest `n` bits set.
    fn low_bits(n: u32) -> u64 {
        if n == 64 {
            u64::MAX
        } else {
            (1u64 << n) - 1
        }
    }

    #[test]
    fn test_cluster_keeps_first_of_each_group() {
        let prints = vec![fp(0), fp(0), fp(u64::MAX), fp(1), fp(u64::MAX)];
        let partition = cluster(&prints, 95.0, SimilarityMetric::Normalized);
        assert_eq!(partition.kept, vec![0, 2]);
        let deleted: Vec<_> = partition.duplicates.iter().map(|m| m.duplicate).collect();
        assert_eq!(deleted, vec![1, 3, 4]);
        assert_eq!(partition.duplicates[2].representative, 2);
    }

    #[test]
    fn test_cluster_is_not_transitive() {
        // Normalized metric, 64 bits, threshold 95% => match iff distance <= 3.
        // A=0, B has 3 bits set (dist 3 from A), C has 6 bits set, 3 shared
        // with B (dist 3 from B, dist 6 from A).
        let a = fp(0);
        let b = fp(0b000_111);
        let c = fp(0b111_111);
        assert_eq!(a.distance(&b), 3);
        assert_eq!(b.distance(&c), 3);
        assert_eq!(a.distance(&c), 6);

        let partition = cluster(&[a, b, c], 95.0, SimilarityMetric::Normalized);
        assert_eq!(partition.kept, vec![0, 2]);
        assert_eq!(
            partition.duplicates,
            vec![DuplicateMatch {
                duplicate: 1,
                representative: 0,
                similarity: (1.0 - 3.0 / 64.0) * 100.0,
            }]
        );
    }

    #[test]
    fn test_cluster_legacy_metric_keeps_distinct_hashes() {
        // Half the bits differ: 50% similar, nowhere near 95.
        let prints = vec![fp(0), fp(low_bits(32)), fp(u64::MAX)];
        let partition = cluster(&prints, 95.0, SimilarityMetric::Legacy);
        assert_eq!(partition.kept, vec![0, 1, 2]);
        assert!(partition.duplicates.is_empty());
    }

    #[test]
    fn test_cluster_legacy_threshold_boundary() {
        // 8x8 grid at 95%: match iff distance <= 3.2.
        let prints = vec![fp(0), fp(low_bits(3)), fp(low_bits(4))];
        let partition = cluster(&prints, 95.0, SimilarityMetric::Legacy);
        assert_eq!(partition.kept, vec![0, 2]);
        assert_eq!(partition.duplicates[0].duplicate, 1);
    }

    #[test]
    fn test_cluster_is_deterministic() {
        let prints: Vec<_> = (0..40u64).map(|i| fp(i.wrapping_mul(0x9E37_79B9_7F4A_7C15))).collect();
        let first = cluster(&prints, 90.0, SimilarityMetric::Normalized);
        let second = cluster(&prints, 90.0, SimilarityMetric::Normalized);
        assert_eq!(first, second);
        assert_eq!(first.kept.len() + first.duplicates.len(), prints.len());
    }

    #[test]
    fn test_cluster_empty() {
        let partition = cluster(&[], 95.0, SimilarityMetric::Legacy);
        assert!(partition.kept.is_empty());
        assert!(partition.duplicates.is_empty());
    }

    /// Fingerprints looked up by file name; names absent from the table
    /// fail to hash.
    struct TableHasher(HashMap<String, Fingerprint>);

    #[async_trait]
    impl HashEngine for TableHasher {
        async fn fingerprint(&self, path: &Path) -> PipelineResult<Fingerprint> {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.0.get(&name).cloned().ok_or(PipelineError::Hash {
                path: path.to_path_buf(),
                message: "cannot open".to_string(),
            })
        }
    }

    fn detector(table: Vec<(&str, Fingerprint)>) -> DuplicateDetector {
        let table = table
            .into_iter()
            .map(|(name, fp)| (name.to_string(), fp))
            .collect();
        let config = DedupConfig {
            threshold_percent: 95.0,
            similarity: SimilarityMetric::Normalized,
            hash_size: 8,
        };
        DuplicateDetector::new(
            Arc::new(TableHasher(table)),
            &config,
            Duration::from_secs(1),
            3,
        )
    }

    fn working_set(dir: &Path, names: &[&str]) -> WorkingSet {
        names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                std::fs::write(&path, name.as_bytes()).unwrap();
                let kind = if name.ends_with(".mp4") {
                    MediaKind::Video
                } else {
                    MediaKind::Image
                };
                MediaRecord::new(path, kind)
            })
            .collect()
    }

    fn names(set: &WorkingSet) -> Vec<String> {
        set.iter()
            .map(|r| r.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_detector_deletes_later_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let set = working_set(
            dir.path(),
            &["a.jpg", "clip.mp4", "b.png", "a_copy.jpg", "broken.jpg"],
        );
        let stage = detector(vec![
            ("a.jpg", fp(0)),
            ("b.png", fp(u64::MAX)),
            ("a_copy.jpg", fp(1)),
        ]);

        let outcome = stage.run(set, &NoopObserver).await.unwrap();

        assert_eq!(names(&outcome.set), vec!["a.jpg", "clip.mp4", "b.png", "broken.jpg"]);
        assert!(!dir.path().join("a_copy.jpg").exists());
        assert!(dir.path().join("broken.jpg").exists());
        assert!(outcome.set.iter().all(|r| r.fingerprint.is_none()));

        assert_eq!(outcome.report.removed(), 1);
        assert_eq!(outcome.report.passed_through(), 1);
        let removal = outcome
            .report
            .events
            .iter()
            .find(|e| e.action == RecordAction::Removed)
            .unwrap();
        assert_eq!(removal.related, Some(dir.path().join("a.jpg")));
    }

    #[tokio::test]
    async fn test_detector_reproduces_non_transitive_chain() {
        let dir = tempfile::tempdir().unwrap();
        let set = working_set(dir.path(), &["A.jpg", "B.jpg", "C.jpg"]);
        let stage = detector(vec![
            ("A.jpg", fp(0)),
            ("B.jpg", fp(0b000_111)),
            ("C.jpg", fp(0b111_111)),
        ]);

        let outcome = stage.run(set, &NoopObserver).await.unwrap();
        assert_eq!(names(&outcome.set), vec!["A.jpg", "C.jpg"]);
        assert!(!dir.path().join("B.jpg").exists());
    }

    #[tokio::test]
    async fn test_detector_drops_duplicate_whose_file_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = working_set(dir.path(), &["keep.jpg"]);
        // Duplicate whose file is already gone.
        set.push(MediaRecord::new(dir.path().join("gone.jpg"), MediaKind::Image));
        let stage = detector(vec![("keep.jpg", fp(7)), ("gone.jpg", fp(7))]);

        let outcome = stage.run(set, &NoopObserver).await.unwrap();
        assert_eq!(names(&outcome.set), vec!["keep.jpg"]);
        let dropped: Vec<PathBuf> = outcome.report.events.iter().map(|e| e.path.clone()).collect();
        assert_eq!(dropped, vec![dir.path().join("gone.jpg")]);
    }
}
