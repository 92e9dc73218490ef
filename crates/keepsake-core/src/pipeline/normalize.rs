//! Format normalization: convert non-canonical containers to PNG and MP4.
//!
//! A conversion that fails or times out leaves the source untouched and the
//! record in the set. A successful one deletes the source and repoints the
//! record at the new file.

use async_trait::async_trait;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

use crate::config::{LimitsConfig, NormalizeConfig, ToolsConfig};
use crate::error::{PipelineError, PipelineResult, Result};
use crate::types::{MediaKind, MediaRecord, RecordAction, StageKind, StageReport};

use super::stage::{bounded, evaluate, Stage, StageObserver, StageOutcome};
use super::working_set::WorkingSet;

/// Canonical container a file is converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    /// Lossless PNG
    Png,
    /// H.264 video with AAC audio
    Mp4,
}

impl TargetFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Png => "png",
            TargetFormat::Mp4 => "mp4",
        }
    }
}

/// Writes a converted copy of `source` to `dest`.
///
/// Implementations must not touch `source`. On error, `dest` may hold a
/// partial file; the caller removes it. Once the future is dropped (the
/// caller timed out), no work left behind may create `dest`.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn convert(&self, source: &Path, dest: &Path, target: TargetFormat) -> PipelineResult<()>;
}

/// Images through the `image` crate, videos through `ffmpeg`.
pub struct MediaTranscoder {
    ffmpeg: String,
}

impl MediaTranscoder {
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            ffmpeg: tools.ffmpeg.clone(),
        }
    }

    /// Decode `source` and write it to `dest` as PNG.
    ///
    /// Runs on a blocking thread that a timeout cannot stop, so `cancelled`
    /// is checked before the write and again after it; a cancelled run
    /// leaves nothing at `dest`.
    fn image_to_png(source: &Path, dest: &Path, cancelled: &AtomicBool) -> PipelineResult<()> {
        let transcode_err = |message: String| PipelineError::Transcode {
            path: source.to_path_buf(),
            message,
        };

        let image = image::ImageReader::open(source)
            .map_err(|e| PipelineError::io(source, e))?
            .with_guessed_format()
            .map_err(|e| PipelineError::io(source, e))?
            .decode()
            .map_err(|e| transcode_err(e.to_string()))?;

        // Flatten alpha; the archive keeps opaque RGB.
        let mut encoded = Vec::new();
        image::DynamicImage::ImageRgb8(image.to_rgb8())
            .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Png)
            .map_err(|e| transcode_err(e.to_string()))?;

        if cancelled.load(Ordering::SeqCst) {
            return Err(transcode_err("cancelled before writing".to_string()));
        }
        std::fs::write(dest, &encoded).map_err(|e| PipelineError::io(dest, e))?;
        if cancelled.load(Ordering::SeqCst) {
            remove_partial(dest);
            return Err(transcode_err("cancelled while writing".to_string()));
        }
        Ok(())
    }

    async fn video_to_mp4(&self, source: &Path, dest: &Path) -> PipelineResult<()> {
        let output = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-i"])
            .arg(source)
            .args(["-c:v", "libx264", "-c:a", "aac", "-movflags", "+faststart", "-y"])
            .arg(dest)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PipelineError::Transcode {
                path: source.to_path_buf(),
                message: format!("Failed to run {}: {e}", self.ffmpeg),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(PipelineError::Transcode {
                path: source.to_path_buf(),
                message: format!("ffmpeg exited with {}: {}", output.status, stderr.trim()),
            })
        }
    }
}

#[async_trait]
impl Transcoder for MediaTranscoder {
    async fn convert(&self, source: &Path, dest: &Path, target: TargetFormat) -> PipelineResult<()> {
        match target {
            TargetFormat::Png => {
                let (src, dst) = (source.to_path_buf(), dest.to_path_buf());
                let guard = CancelOnDrop::default();
                let cancelled = Arc::clone(&guard.0);
                tokio::task::spawn_blocking(move || Self::image_to_png(&src, &dst, &cancelled))
                    .await
                    .map_err(|e| PipelineError::Transcode {
                        path: source.to_path_buf(),
                        message: format!("Task join error: {e}"),
                    })?
            }
            TargetFormat::Mp4 => self.video_to_mp4(source, dest).await,
        }
    }
}

/// Raises its flag when dropped, including when a timeout drops the
/// future that owns it.
#[derive(Default)]
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// First free `stem.ext`, `stem_1.ext`, `stem_2.ext`, ... next to `source`.
///
/// A name is free if nothing exists on disk and `reserved` does not hold it.
pub fn free_target_path(source: &Path, ext: &str, reserved: &HashSet<PathBuf>) -> PathBuf {
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let taken = |p: &Path| p.exists() || reserved.contains(p);
    let mut candidate = dir.join(format!("{stem}.{ext}"));
    let mut n = 1;
    while taken(&candidate) {
        candidate = dir.join(format!("{stem}_{n}.{ext}"));
        n += 1;
    }
    candidate
}

/// A planned conversion for one record.
#[derive(Debug, Clone)]
struct Job {
    dest: PathBuf,
    target: TargetFormat,
    timeout: Duration,
}

/// Converts configured source formats to the canonical ones.
pub struct NormalizeStage {
    transcoder: Arc<dyn Transcoder>,
    image_sources: HashSet<String>,
    video_sources: HashSet<String>,
    image_timeout: Duration,
    video_timeout: Duration,
    workers: usize,
}

impl NormalizeStage {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        normalize: &NormalizeConfig,
        limits: &LimitsConfig,
        workers: usize,
    ) -> Self {
        let lower = |exts: &[String]| -> HashSet<String> {
            exts.iter().map(|e| e.to_ascii_lowercase()).collect()
        };
        Self {
            transcoder,
            image_sources: lower(&normalize.image_sources),
            video_sources: lower(&normalize.video_sources),
            image_timeout: limits.image_convert_timeout(),
            video_timeout: limits.video_convert_timeout(),
            workers,
        }
    }

    fn target_for(&self, record: &MediaRecord) -> Option<(TargetFormat, Duration)> {
        let ext = record.extension()?;
        match record.kind {
            MediaKind::Image if self.image_sources.contains(&ext) => {
                Some((TargetFormat::Png, self.image_timeout))
            }
            MediaKind::Video if self.video_sources.contains(&ext) => {
                Some((TargetFormat::Mp4, self.video_timeout))
            }
            _ => None,
        }
    }

    /// Pick destinations up front so concurrent conversions never collide
    /// with each other or with a record already in the set.
    fn plan(&self, set: &WorkingSet) -> Vec<Option<Job>> {
        let mut reserved: HashSet<PathBuf> = set.paths().map(Path::to_path_buf).collect();
        set.iter()
            .map(|record| {
                let (target, timeout) = self.target_for(record)?;
                let dest = free_target_path(&record.path, target.extension(), &reserved);
                reserved.insert(dest.clone());
                Some(Job {
                    dest,
                    target,
                    timeout,
                })
            })
            .collect()
    }
}

fn remove_partial(dest: &Path) {
    match std::fs::remove_file(dest) {
        Ok(()) => tracing::debug!("Removed partial output {:?}", dest),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove partial output {:?}: {}", dest, e),
    }
}

#[async_trait]
impl Stage for NormalizeStage {
    fn kind(&self) -> StageKind {
        StageKind::Normalize
    }

    async fn run(&self, set: WorkingSet, observer: &dyn StageObserver) -> Result<StageOutcome> {
        let mut report = StageReport::new(self.kind(), set.len());
        observer.stage_started(self.kind(), set.len());

        let jobs = self.plan(&set);
        let pending = jobs.iter().flatten().count();
        tracing::debug!("{} file(s) need conversion", pending);

        // Records and plan are index-aligned; evaluate visits records in order.
        let mut next = 0;
        let results = evaluate(set.records(), self.workers, self.kind(), observer, |record| {
            let transcoder = Arc::clone(&self.transcoder);
            let source = record.path.clone();
            let job = jobs[next].clone();
            next += 1;
            async move {
                let Some(job) = job else {
                    return None;
                };
                let result = bounded(
                    StageKind::Normalize,
                    &source,
                    job.timeout,
                    transcoder.convert(&source, &job.dest, job.target),
                )
                .await;
                if result.is_err() {
                    remove_partial(&job.dest);
                }
                Some(result.map(|()| (job.dest, job.target)))
            }
        })
        .await;

        let mut survivors = WorkingSet::new();
        for (mut record, result) in set.into_iter().zip(results) {
            match result {
                None => {}
                Some(Ok((dest, target))) => {
                    let source = record.path.clone();
                    let mut reason = format!("converted to {}", target.extension());
                    if let Err(e) = std::fs::remove_file(&source) {
                        if e.kind() != ErrorKind::NotFound {
                            tracing::warn!("Converted {:?} but could not delete it: {}", source, e);
                            reason.push_str(&format!(" (original kept: {e})"));
                        }
                    }
                    tracing::debug!("Converted {:?} -> {:?}", source, dest);
                    report.push(&source, RecordAction::Converted, reason, Some(dest.clone()));
                    record.replace_path(dest);
                }
                Some(Err(e)) => {
                    tracing::warn!("Keeping {:?} unconverted: {}", record.path, e);
                    report.push(
                        &record.path,
                        RecordAction::PassedThrough,
                        format!("conversion failed: {e}"),
                        None,
                    );
                }
            }
            survivors.push(record);
        }

        report.records_out = survivors.len();
        tracing::info!(
            "Converted {} file(s), {} left in their original format",
            report.converted(),
            report.passed_through()
        );
        observer.stage_finished(&report);
        Ok(StageOutcome {
            set: survivors,
            report,
        })
    }
}
