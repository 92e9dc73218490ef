//! The `keepsake curate` command.

mod progress;
pub mod types;

pub use types::{Order, ReportFileFormat, Similarity};

use clap::Args;
use dialoguer::Confirm;
use keepsake_core::{Config, CurationReport, Orchestrator, OrganizeReport, ReportWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use progress::ProgressObserver;

/// Arguments for the `curate` command.
#[derive(Args, Debug)]
pub struct CurateArgs {
    /// Folder to clean up. Rejected files are deleted from it.
    #[arg(required = true)]
    pub root: PathBuf,

    /// Archive directory (defaults to `organize.output_dir`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Copy without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Stop after the filtering stages
    #[arg(long)]
    pub skip_organize: bool,

    /// Number of parallel workers
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Similarity percentage at or above which images are duplicates
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Distance-to-similarity formula
    #[arg(long, value_enum)]
    pub similarity: Option<Similarity>,

    /// Order in which files enter the pipeline
    #[arg(long, value_enum)]
    pub order: Option<Order>,

    /// Write every per-file decision to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Report file format
    #[arg(long, value_enum, default_value = "json")]
    pub report_format: ReportFileFormat,
}

impl CurateArgs {
    /// Fold command-line overrides into the loaded config.
    fn apply(&self, config: &mut Config) {
        if let Some(parallel) = self.parallel {
            config.processing.parallel_workers = parallel;
        }
        if let Some(threshold) = self.threshold {
            config.dedup.threshold_percent = threshold;
        }
        if let Some(similarity) = self.similarity {
            config.dedup.similarity = similarity.into();
        }
        if let Some(order) = self.order {
            config.processing.collection_order = order.into();
        }
        if let Some(output) = &self.output {
            config.organize.output_dir = output.clone();
        }
        if self.yes {
            config.organize.confirm_before_write = false;
        }
    }
}

/// Execute the curate command.
pub async fn execute(args: CurateArgs, mut config: Config) -> anyhow::Result<()> {
    args.apply(&mut config);
    config.validate()?;

    let target = config.output_dir();
    let confirm = config.organize.confirm_before_write;
    let start = Instant::now();

    eprintln!("Curating {} ...", args.root.display());
    let orchestrator =
        Orchestrator::new(config).with_observer(Arc::new(ProgressObserver::default()));
    let curation = orchestrator.curate(&args.root).await?;
    print_summary(&curation.report, start.elapsed());

    let organized = if args.skip_organize {
        None
    } else if curation.set.is_empty() {
        eprintln!("Nothing survived curation; skipping the copy.");
        None
    } else if confirm && !confirm_copy(curation.set.len(), &target)? {
        eprintln!("Copy skipped.");
        None
    } else {
        let report = orchestrator.organize(curation.set, &target).await?;
        print_organize_summary(&report, &target);
        Some(report)
    };

    if let Some(path) = &args.report {
        write_report(path, args.report_format, &curation.report, organized.as_ref())?;
        eprintln!("Report written to {}", path.display());
    }

    Ok(())
}

fn confirm_copy(count: usize, target: &Path) -> anyhow::Result<bool> {
    if !console::Term::stderr().is_term() {
        anyhow::bail!(
            "Refusing to copy without confirmation on a non-interactive terminal; pass --yes"
        );
    }
    let answer = Confirm::with_theme(&super::theme::keepsake_theme())
        .with_prompt(format!("Copy {count} file(s) to {}?", target.display()))
        .default(true)
        .interact_opt()?;
    Ok(matches!(answer, Some(true)))
}

fn write_report(
    path: &Path,
    format: ReportFileFormat,
    curation: &CurationReport,
    organized: Option<&OrganizeReport>,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut writer = ReportWriter::new(BufWriter::new(file), format.into());
    writer.write_report(curation, organized)?;
    Ok(())
}

/// Print a formatted summary table after curation.
fn print_summary(report: &CurationReport, elapsed: std::time::Duration) {
    let removed: usize = report.stages.iter().map(|s| s.removed()).sum();
    let converted: usize = report.stages.iter().map(|s| s.converted()).sum();
    let untouched: usize = report.stages.iter().map(|s| s.passed_through()).sum();

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Collected:    {:>8}", report.collected);
    eprintln!("    Removed:      {:>8}", removed);
    if converted > 0 {
        eprintln!("    Converted:    {:>8}", converted);
    }
    if untouched > 0 {
        eprintln!("    Kept as-is:   {:>8}", untouched);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Remaining:    {:>8}", report.survivors);
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("  ====================================");
}

fn print_organize_summary(report: &OrganizeReport, target: &Path) {
    eprintln!();
    eprintln!("  Copied {} file(s) into {}", report.copied, target.display());
    if report.renamed > 0 {
        eprintln!("  {} renamed to avoid name collisions", report.renamed);
    }
    for (path, error) in &report.failed {
        eprintln!("  Failed: {} ({error})", path.display());
    }
}
