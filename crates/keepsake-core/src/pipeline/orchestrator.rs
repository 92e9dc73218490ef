//! Pipeline orchestration: collection, the five filtering stages in fixed
//! order, then the optional chronological copy.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::Result;
use crate::types::{CurationReport, OrganizeReport};

use super::dedup::DuplicateDetector;
use super::discovery::FileDiscovery;
use super::hash::{HashEngine, PerceptualHasher};
use super::inspect::{MediaInspector, ProbeInspector};
use super::normalize::{MediaTranscoder, NormalizeStage, Transcoder};
use super::organize::ChronologicalOrganizer;
use super::quality::QualityFilter;
use super::size_filter::SizeFilter;
use super::stage::{NoopObserver, Stage, StageObserver};
use super::validate::ValidateStage;
use super::working_set::WorkingSet;

/// Survivors of a curation run and what happened on the way.
#[derive(Debug)]
pub struct Curation {
    pub set: WorkingSet,
    pub report: CurationReport,
}

/// Wires configuration and collaborators into the fixed stage sequence.
///
/// Collaborators default to the real tools; the `with_*` builders swap them.
pub struct Orchestrator {
    config: Config,
    inspector: Arc<dyn MediaInspector>,
    transcoder: Arc<dyn Transcoder>,
    hasher: Arc<dyn HashEngine>,
    observer: Arc<dyn StageObserver>,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        Self {
            inspector: Arc::new(ProbeInspector::new(&config.tools)),
            transcoder: Arc::new(MediaTranscoder::new(&config.tools)),
            hasher: Arc::new(PerceptualHasher::new(config.dedup.hash_size)),
            observer: Arc::new(NoopObserver),
            config,
        }
    }

    pub fn with_inspector(mut self, inspector: Arc<dyn MediaInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = transcoder;
        self
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn HashEngine>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn StageObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn stages(&self, root: &Path) -> Vec<Box<dyn Stage>> {
        let workers = self.config.processing.parallel_workers;
        let limits = &self.config.limits;
        vec![
            Box::new(ValidateStage::new(
                Arc::clone(&self.inspector),
                root,
                limits.validate_timeout(),
                workers,
            )),
            Box::new(SizeFilter::new(limits)),
            Box::new(NormalizeStage::new(
                Arc::clone(&self.transcoder),
                &self.config.normalize,
                limits,
                workers,
            )),
            Box::new(QualityFilter::new(Arc::clone(&self.inspector), limits, workers)),
            Box::new(DuplicateDetector::new(
                Arc::clone(&self.hasher),
                &self.config.dedup,
                limits.hash_timeout(),
                workers,
            )),
        ]
    }

    /// Collect `root` and run every filtering stage over it.
    ///
    /// Only a bad root or an empty collection is fatal; everything else is
    /// handled per record and shows up in the report.
    pub async fn curate(&self, root: &Path) -> Result<Curation> {
        let start = Instant::now();
        let discovery = FileDiscovery::new(self.config.processing.clone());
        let mut set = discovery.collect(root)?;

        let mut report = CurationReport {
            collected: set.len(),
            ..CurationReport::default()
        };
        tracing::info!(
            "Collected {} file(s) under {:?} ({} images, {} videos)",
            set.len(),
            root,
            set.count_kind(crate::types::MediaKind::Image),
            set.count_kind(crate::types::MediaKind::Video)
        );

        for stage in self.stages(root) {
            let stage_start = Instant::now();
            tracing::info!("{} ({} file(s))", stage.kind().label(), set.len());
            let outcome = stage.run(set, self.observer.as_ref()).await?;
            tracing::trace!(
                "{} finished in {:?}: {} -> {}",
                stage.kind().label(),
                stage_start.elapsed(),
                outcome.report.records_in,
                outcome.report.records_out
            );
            set = outcome.set;
            report.stages.push(outcome.report);
        }

        report.survivors = set.len();
        tracing::info!(
            "Curation finished in {:?}: {} of {} file(s) kept",
            start.elapsed(),
            report.survivors,
            report.collected
        );
        Ok(Curation { set, report })
    }

    /// Copy the curated set into a chronological tree under `target`.
    pub async fn organize(&self, set: WorkingSet, target: &Path) -> Result<OrganizeReport> {
        let organizer = ChronologicalOrganizer::new(target, &self.config.organize);
        let mut records = set.into_records();
        tokio::task::spawn_blocking(move || organizer.organize(&mut records))
            .await
            .map_err(|e| std::io::Error::other(format!("Organize task failed: {e}")))?
    }
}
