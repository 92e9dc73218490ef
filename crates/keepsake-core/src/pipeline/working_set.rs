//! The ordered, path-unique record collection threaded through every stage.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::types::{MediaKind, MediaRecord};

/// Ordered collection of media records, unique by path.
///
/// Order is collection order and is load-bearing: duplicate detection keeps
/// the earliest record of a cluster. Stages never mutate a set in place;
/// they consume it and build the next one.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    records: Vec<MediaRecord>,
    paths: HashSet<PathBuf>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Returns `false` (and drops the record) when another
    /// record already holds the same path.
    pub fn push(&mut self, record: MediaRecord) -> bool {
        if !self.paths.insert(record.path.clone()) {
            tracing::warn!("Ignoring second record for {:?}", record.path);
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn records(&self) -> &[MediaRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MediaRecord> {
        self.records.iter()
    }

    /// Number of records of the given kind.
    pub fn count_kind(&self, kind: MediaKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.records.iter().map(|r| r.path.as_path())
    }

    pub fn into_records(self) -> Vec<MediaRecord> {
        self.records
    }
}

impl FromIterator<MediaRecord> for WorkingSet {
    fn from_iter<I: IntoIterator<Item = MediaRecord>>(iter: I) -> Self {
        let mut set = WorkingSet::new();
        for record in iter {
            set.push(record);
        }
        set
    }
}

impl IntoIterator for WorkingSet {
    type Item = MediaRecord;
    type IntoIter = std::vec::IntoIter<MediaRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a WorkingSet {
    type Item = &'a MediaRecord;
    type IntoIter = std::slice::Iter<'a, MediaRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_rejects_duplicate_paths() {
        let mut set = WorkingSet::new();
        assert!(set.push(MediaRecord::new("/a.jpg", MediaKind::Image)));
        assert!(!set.push(MediaRecord::new("/a.jpg", MediaKind::Video)));
        assert_eq!(set.len(), 1);
        assert_eq!(set.records()[0].kind, MediaKind::Image);
    }

    #[test]
    fn test_collect_preserves_order() {
        let set: WorkingSet = ["/c.jpg", "/a.mp4", "/b.png"]
            .iter()
            .map(|p| {
                let kind = if p.ends_with("mp4") {
                    MediaKind::Video
                } else {
                    MediaKind::Image
                };
                MediaRecord::new(*p, kind)
            })
            .collect();

        let paths: Vec<_> = set.paths().map(|p| p.to_string_lossy().into_owned()).collect();
        assert_eq!(paths, vec!["/c.jpg", "/a.mp4", "/b.png"]);
        assert_eq!(set.count_kind(MediaKind::Image), 2);
        assert!(set.contains(Path::new("/a.mp4")));
    }
}
