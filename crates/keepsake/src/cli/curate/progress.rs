//! Progress bars driven by stage events.

use indicatif::{ProgressBar, ProgressStyle};
use keepsake_core::{StageKind, StageObserver, StageReport};
use std::sync::Mutex;

/// One bar per stage, replaced when the next stage starts.
#[derive(Default)]
pub struct ProgressObserver {
    bar: Mutex<Option<ProgressBar>>,
}

fn create_progress_bar(stage: StageKind, total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} {msg:<26} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message(stage.label());
    pb
}

impl StageObserver for ProgressObserver {
    fn stage_started(&self, stage: StageKind, total: usize) {
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(create_progress_bar(stage, total as u64));
        }
    }

    fn record_finished(&self, _stage: StageKind) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(pb) = slot.as_ref() {
                pb.inc(1);
            }
        }
    }

    fn stage_finished(&self, report: &StageReport) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(pb) = slot.take() {
                pb.finish_and_clear();
            }
        }
        eprintln!(
            "  {:<26} {:>6} -> {:<6} ({} removed, {} converted, {} kept as-is)",
            report.stage.label(),
            report.records_in,
            report.records_out,
            report.removed(),
            report.converted(),
            report.passed_through()
        );
    }
}
