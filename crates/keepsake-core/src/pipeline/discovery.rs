//! File collection: walk the source tree and build the initial working set.

use std::path::Path;
use walkdir::WalkDir;

use crate::config::{CollectionOrder, ProcessingConfig};
use crate::error::CollectionError;
use crate::types::{extension_of, MediaKind, MediaRecord};

use super::working_set::WorkingSet;

/// Collects photo and video files under a root directory.
pub struct FileDiscovery {
    config: ProcessingConfig,
}

impl FileDiscovery {
    /// Create a new file discovery instance.
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// Walk `root` recursively and return every eligible file as a record.
    ///
    /// Files with other extensions are ignored and never touched. Symlinks
    /// are not followed, so nothing outside the tree can be deleted.
    pub fn collect(&self, root: &Path) -> Result<WorkingSet, CollectionError> {
        if !root.exists() {
            return Err(CollectionError::InvalidRoot {
                path: root.to_path_buf(),
                reason: "path does not exist".to_string(),
            });
        }
        if !root.is_dir() {
            return Err(CollectionError::InvalidRoot {
                path: root.to_path_buf(),
                reason: "path is not a directory".to_string(),
            });
        }

        let mut records = Vec::new();
        let mut ignored = 0usize;

        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {:?}: {}", root, e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(kind) = self.classify(entry.path()) else {
                ignored += 1;
                continue;
            };
            let mut record = MediaRecord::new(entry.path(), kind);
            record.size_bytes = entry.metadata().ok().map(|m| m.len());
            records.push(record);
        }

        if self.config.collection_order == CollectionOrder::Path {
            records.sort_by(|a, b| a.path.cmp(&b.path));
        }

        tracing::debug!(
            "Collected {} media file(s), ignored {} other file(s)",
            records.len(),
            ignored
        );

        if records.is_empty() {
            return Err(CollectionError::EmptyCollection {
                path: root.to_path_buf(),
            });
        }

        Ok(records.into_iter().collect())
    }

    /// Classify a file by extension, or `None` when it is not media.
    pub fn classify(&self, path: &Path) -> Option<MediaKind> {
        let ext = extension_of(path)?;
        let matches = |list: &[String]| list.iter().any(|e| e.eq_ignore_ascii_case(&ext));

        if matches(&self.config.image_extensions) {
            Some(MediaKind::Image)
        } else if matches(&self.config.video_extensions) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_classify() {
        let discovery = FileDiscovery::new(ProcessingConfig::default());

        assert_eq!(discovery.classify(Path::new("a.jpg")), Some(MediaKind::Image));
        assert_eq!(discovery.classify(Path::new("a.JPEG")), Some(MediaKind::Image));
        assert_eq!(discovery.classify(Path::new("a.heic")), Some(MediaKind::Image));
        assert_eq!(discovery.classify(Path::new("a.MOV")), Some(MediaKind::Video));
        assert_eq!(discovery.classify(Path::new("a.webm")), Some(MediaKind::Video));
        assert_eq!(discovery.classify(Path::new("notes.txt")), None);
        assert_eq!(discovery.classify(Path::new("README")), None);
    }

    #[test]
    fn test_collect_missing_root() {
        let discovery = FileDiscovery::new(ProcessingConfig::default());
        let err = discovery
            .collect(Path::new("/nonexistent/keepsake/root"))
            .unwrap_err();
        assert!(matches!(err, CollectionError::InvalidRoot { .. }));
    }

    #[test]
    fn test_collect_root_is_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.jpg");
        fs::write(&file, b"x").unwrap();

        let discovery = FileDiscovery::new(ProcessingConfig::default());
        let err = discovery.collect(&file).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_collect_only_ignored_files_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let discovery = FileDiscovery::new(ProcessingConfig::default());
        let err = discovery.collect(dir.path()).unwrap_err();
        assert!(matches!(err, CollectionError::EmptyCollection { .. }));
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_collect_recursive_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        fs::write(dir.path().join("b.mp4"), b"video").unwrap();
        fs::write(dir.path().join("nested/deeper/a.png"), b"image").unwrap();
        fs::write(dir.path().join("a.jpg"), b"img").unwrap();
        fs::write(dir.path().join("skip.txt"), b"text").unwrap();

        let discovery = FileDiscovery::new(ProcessingConfig::default());
        let set = discovery.collect(dir.path()).unwrap();

        let names: Vec<_> = set
            .iter()
            .map(|r| r.path.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                Path::new("a.jpg").to_path_buf(),
                Path::new("b.mp4").to_path_buf(),
                Path::new("nested/deeper/a.png").to_path_buf(),
            ]
        );
        assert_eq!(set.records()[1].kind, MediaKind::Video);
        assert_eq!(set.records()[1].size_bytes, Some(5));
    }
}
