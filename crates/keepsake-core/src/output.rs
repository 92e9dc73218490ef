//! Report output as JSON or JSON Lines.
//!
//! JSON writes the whole report as one document. JSON Lines writes one
//! record event per line, which suits grepping and streaming tools.

use serde::Serialize;
use std::io::{self, Write};

use crate::types::{CurationReport, OrganizeReport};

/// Report file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// One pretty-printed document
    #[default]
    Json,
    /// One record event per line
    JsonLines,
}

#[derive(Serialize)]
struct FullReport<'a> {
    version: &'static str,
    curation: &'a CurationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    organize: Option<&'a OrganizeReport>,
}

/// Serializes curation outcomes to any writer.
pub struct ReportWriter<W: Write> {
    writer: W,
    format: ReportFormat,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W, format: ReportFormat) -> Self {
        Self { writer, format }
    }

    /// Write the curation report, plus the organize report when the copy ran.
    ///
    /// JSON Lines only carries the record events; organize failures are
    /// appended as `{"organize_failed": ...}` lines.
    pub fn write_report(
        &mut self,
        curation: &CurationReport,
        organize: Option<&OrganizeReport>,
    ) -> io::Result<()> {
        match self.format {
            ReportFormat::Json => {
                let full = FullReport {
                    version: crate::VERSION,
                    curation,
                    organize,
                };
                serde_json::to_writer_pretty(&mut self.writer, &full).map_err(io::Error::other)?;
                writeln!(self.writer)?;
            }
            ReportFormat::JsonLines => {
                for event in curation.events() {
                    self.write_line(event)?;
                }
                for (path, error) in organize.map(|o| o.failed.as_slice()).unwrap_or_default() {
                    self.write_line(&serde_json::json!({
                        "organize_failed": path,
                        "error": error,
                    }))?;
                }
            }
        }
        self.writer.flush()
    }

    fn write_line<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        writeln!(self.writer)?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecordAction, StageKind, StageReport};
    use std::path::{Path, PathBuf};

    fn sample() -> CurationReport {
        let mut validate = StageReport::new(StageKind::Validate, 3);
        validate.push(Path::new("/p/bad.jpg"), RecordAction::Removed, "corrupt", None);
        validate.records_out = 2;

        let mut dedup = StageReport::new(StageKind::Deduplicate, 2);
        dedup.push(
            Path::new("/p/b.jpg"),
            RecordAction::Removed,
            "duplicate",
            Some(PathBuf::from("/p/a.jpg")),
        );
        dedup.records_out = 1;

        CurationReport {
            collected: 3,
            stages: vec![validate, dedup],
            survivors: 1,
        }
    }

    #[test]
    fn test_json_report_is_one_document() {
        let mut writer = ReportWriter::new(Vec::new(), ReportFormat::Json);
        writer.write_report(&sample(), None).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&writer.into_inner()).unwrap();
        assert_eq!(value["curation"]["collected"], 3);
        assert_eq!(value["curation"]["stages"][1]["stage"], "deduplicate");
        assert_eq!(value["curation"]["stages"][1]["events"][0]["related"], "/p/a.jpg");
        assert!(value.get("organize").is_none());
    }

    #[test]
    fn test_jsonl_report_has_one_line_per_event() {
        let organize = OrganizeReport {
            copied: 0,
            renamed: 0,
            failed: vec![(PathBuf::from("/p/a.jpg"), "denied".to_string())],
            directories: vec![],
        };
        let mut writer = ReportWriter::new(Vec::new(), ReportFormat::JsonLines);
        writer.write_report(&sample(), Some(&organize)).unwrap();

        let output = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["action"], "removed");
        assert_eq!(lines[0]["stage"], "validate");
        assert!(lines[0].get("related").is_none());
        assert_eq!(lines[2]["error"], "denied");
    }
}
