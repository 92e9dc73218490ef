//! Chronological copy of the surviving media into `Photos/<year>/<Month>`
//! and `Videos/<year>/<Month>`.
//!
//! Sources are only read. Placement uses the file modification time in the
//! local time zone. Both category trees get a `<year>/<Month>` directory for
//! every month that holds a survivor of either kind.

use chrono::{DateTime, Datelike, Local, Month};
use filetime::FileTime;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::OrganizeConfig;
use crate::error::{PipelineError, Result};
use crate::types::{MediaKind, MediaRecord, OrganizeReport};

/// Copies records into a year/month tree under a target root.
#[derive(Debug, Clone)]
pub struct ChronologicalOrganizer {
    root: PathBuf,
    photos_dir: String,
    videos_dir: String,
    preserve_mtime: bool,
}

impl ChronologicalOrganizer {
    pub fn new(root: impl Into<PathBuf>, config: &OrganizeConfig) -> Self {
        Self {
            root: root.into(),
            photos_dir: config.photos_dir.clone(),
            videos_dir: config.videos_dir.clone(),
            preserve_mtime: config.preserve_mtime,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn category_dir(&self, kind: MediaKind) -> PathBuf {
        let category = match kind {
            MediaKind::Image => &self.photos_dir,
            MediaKind::Video => &self.videos_dir,
        };
        self.root.join(category)
    }

    /// `<root>/<Photos|Videos>/<year>/<Month>` for a record taken at `when`.
    pub fn month_dir(&self, kind: MediaKind, when: &DateTime<Local>) -> PathBuf {
        self.category_dir(kind)
            .join(when.year().to_string())
            .join(month_name(when.month()))
    }

    /// Copy every record into place.
    ///
    /// Fails only if the target root or a category root cannot be created;
    /// per-file problems land in [`OrganizeReport::failed`].
    pub fn organize(&self, records: &mut [MediaRecord]) -> Result<OrganizeReport> {
        for dir in [
            self.root.clone(),
            self.category_dir(MediaKind::Image),
            self.category_dir(MediaKind::Video),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| PipelineError::io(&dir, e))?;
        }

        let mut report = OrganizeReport::default();

        // Dates first, so the month layout is known before anything is copied.
        let mut stamps = Vec::with_capacity(records.len());
        let mut months = BTreeSet::new();
        for record in records.iter_mut() {
            match capture_time(&record.path) {
                Ok((when, mtime)) => {
                    record.capture_timestamp = Some(when);
                    months.insert((when.year(), when.month()));
                    stamps.push(Some((when, mtime)));
                }
                Err(e) => {
                    tracing::warn!("Failed to read the date of {:?}: {}", record.path, e);
                    report.failed.push((record.path.clone(), e.to_string()));
                    stamps.push(None);
                }
            }
        }

        for &(year, month) in &months {
            for kind in [MediaKind::Image, MediaKind::Video] {
                let dir = self
                    .category_dir(kind)
                    .join(year.to_string())
                    .join(month_name(month));
                match std::fs::create_dir_all(&dir) {
                    Ok(()) => report.directories.push(dir),
                    Err(e) => tracing::warn!("Failed to create {:?}: {}", dir, e),
                }
            }
        }

        for (record, stamp) in records.iter().zip(stamps) {
            let Some((when, mtime)) = stamp else {
                continue;
            };
            match self.place(record, &when, mtime) {
                Ok(renamed) => {
                    report.copied += 1;
                    if renamed {
                        report.renamed += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to copy {:?}: {}", record.path, e);
                    report.failed.push((record.path.clone(), e.to_string()));
                }
            }
        }

        tracing::info!(
            "Copied {} file(s) into {:?} ({} renamed, {} failed)",
            report.copied,
            self.root,
            report.renamed,
            report.failed.len()
        );
        Ok(report)
    }

    /// Copy one record into its month directory; true if it was renamed.
    fn place(
        &self,
        record: &MediaRecord,
        when: &DateTime<Local>,
        mtime: FileTime,
    ) -> io::Result<bool> {
        let dir = self.month_dir(record.kind, when);
        let file_name = record
            .path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
        let (dest, renamed) = unique_destination(&dir, Path::new(file_name));

        std::fs::copy(&record.path, &dest)?;
        if self.preserve_mtime {
            filetime::set_file_mtime(&dest, mtime)?;
        }
        tracing::debug!("Copied {:?} -> {:?}", record.path, dest);
        Ok(renamed)
    }
}

/// Local modification time of `path`, plus the raw value for copying over.
fn capture_time(path: &Path) -> io::Result<(DateTime<Local>, FileTime)> {
    let metadata = std::fs::metadata(path)?;
    let when: DateTime<Local> = metadata.modified()?.into();
    Ok((when, FileTime::from_last_modification_time(&metadata)))
}

/// English month name for a 1-based month number.
fn month_name(month: u32) -> &'static str {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name())
        .unwrap_or("Unknown")
}

/// `dir/name`, or the first free `dir/stem_N.ext` if that is taken.
fn unique_destination(dir: &Path, name: &Path) -> (PathBuf, bool) {
    let first = dir.join(name);
    if !first.exists() {
        return (first, false);
    }

    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1;
    loop {
        let candidate = dir.join(format!("{stem}_{n}{ext}"));
        if !candidate.exists() {
            return (candidate, true);
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local(year: i32, month: u32, day: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(year, month, day, 12, 0, 0)
            .single()
            .unwrap()
    }

    fn media(dir: &Path, sub: &str, name: &str, kind: MediaKind, when: DateTime<Local>) -> MediaRecord {
        let folder = dir.join(sub);
        std::fs::create_dir_all(&folder).unwrap();
        let path = folder.join(name);
        std::fs::write(&path, name.as_bytes()).unwrap();
        filetime::set_file_mtime(&path, FileTime::from_unix_time(when.timestamp(), 0)).unwrap();
        MediaRecord::new(path, kind)
    }

    #[test]
    fn test_month_names() {
        assert_eq!(month_name(1), "January");
        assert_eq!(month_name(3), "March");
        assert_eq!(month_name(12), "December");
        assert_eq!(month_name(13), "Unknown");
    }

    #[test]
    fn test_organize_places_by_year_and_month() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let mut records = vec![
            media(src.path(), "a", "beach.jpg", MediaKind::Image, local(2023, 3, 14)),
            media(src.path(), "a", "party.mp4", MediaKind::Video, local(2024, 3, 2)),
        ];

        let organizer = ChronologicalOrganizer::new(out.path(), &OrganizeConfig::default());
        let report = organizer.organize(&mut records).unwrap();

        let photo = out.path().join("Photos/2023/March/beach.jpg");
        let video = out.path().join("Videos/2024/March/party.mp4");
        assert!(photo.exists());
        assert!(video.exists());
        assert_eq!(report.copied, 2);
        assert_eq!(report.renamed, 0);
        assert!(report.failed.is_empty());

        // Both trees get every month that holds a survivor, and nothing else.
        for dir in [
            "Photos/2023/March",
            "Photos/2024/March",
            "Videos/2023/March",
            "Videos/2024/March",
        ] {
            assert!(out.path().join(dir).is_dir(), "{dir}");
        }
        assert!(!out.path().join("Photos/2023/April").exists());
        assert_eq!(report.directories.len(), 4);

        // Sources stay; timestamps travel with the copy.
        assert!(records[0].path.exists());
        let copied = FileTime::from_last_modification_time(&std::fs::metadata(&photo).unwrap());
        assert_eq!(copied.unix_seconds(), local(2023, 3, 14).timestamp());
        assert_eq!(records[0].capture_timestamp, Some(local(2023, 3, 14)));
    }

    #[test]
    fn test_organize_suffixes_colliding_names() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let when = local(2022, 7, 1);
        let mut records = vec![
            media(src.path(), "one", "IMG_0001.jpg", MediaKind::Image, when),
            media(src.path(), "two", "IMG_0001.jpg", MediaKind::Image, when),
            media(src.path(), "three", "IMG_0001.jpg", MediaKind::Image, when),
        ];

        let organizer = ChronologicalOrganizer::new(out.path(), &OrganizeConfig::default());
        let report = organizer.organize(&mut records).unwrap();

        let month = out.path().join("Photos/2022/July");
        assert_eq!(std::fs::read(month.join("IMG_0001.jpg")).unwrap(), b"IMG_0001.jpg");
        assert!(month.join("IMG_0001_1.jpg").exists());
        assert!(month.join("IMG_0001_2.jpg").exists());
        assert_eq!(report.copied, 3);
        assert_eq!(report.renamed, 2);
        assert_eq!(
            report.directories,
            vec![month, out.path().join("Videos/2022/July")]
        );
    }

    #[test]
    fn test_missing_source_is_reported_not_fatal() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let mut records = vec![
            MediaRecord::new(src.path().join("vanished.jpg"), MediaKind::Image),
            media(src.path(), "", "ok.jpg", MediaKind::Image, local(2021, 1, 5)),
        ];

        let organizer = ChronologicalOrganizer::new(out.path(), &OrganizeConfig::default());
        let report = organizer.organize(&mut records).unwrap();

        assert_eq!(report.copied, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, src.path().join("vanished.jpg"));
        assert!(out.path().join("Photos/2021/January/ok.jpg").exists());
    }

    #[test]
    fn test_category_roots_always_exist() {
        let out = tempfile::tempdir().unwrap();
        let organizer = ChronologicalOrganizer::new(out.path(), &OrganizeConfig::default());
        let report = organizer.organize(&mut []).unwrap();

        assert!(out.path().join("Photos").is_dir());
        assert!(out.path().join("Videos").is_dir());
        assert!(report.directories.is_empty());
    }

    #[test]
    fn test_custom_category_names() {
        let config = OrganizeConfig {
            photos_dir: "Bilder".to_string(),
            videos_dir: "Filme".to_string(),
            ..OrganizeConfig::default()
        };
        let organizer = ChronologicalOrganizer::new("/archive", &config);
        assert_eq!(
            organizer.month_dir(MediaKind::Video, &local(2020, 11, 3)),
            PathBuf::from("/archive/Filme/2020/November")
        );
    }
}
