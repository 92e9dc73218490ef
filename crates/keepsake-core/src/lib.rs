//! Keepsake Core - photo and video collection curation.
//!
//! Keepsake takes a folder of accumulated media and reduces it in place to a
//! clean, de-duplicated set, then copies the survivors into a chronological
//! archive:
//!
//! ```text
//! Collect → Validate → SizeFilter → Normalize → QualityFilter → Deduplicate → Organize
//! ```
//!
//! Every filtering stage deletes what it rejects from the source tree.
//! The final copy never touches the sources.
//!
//! # Usage
//!
//! ```rust,no_run
//! use keepsake_core::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> keepsake_core::Result<()> {
//!     let config = Config::load()?;
//!     let target = config.output_dir();
//!     let orchestrator = Orchestrator::new(config);
//!
//!     let curation = orchestrator.curate("./Camera Uploads".as_ref()).await?;
//!     println!("{} file(s) kept", curation.report.survivors);
//!
//!     let organized = orchestrator.organize(curation.set, &target).await?;
//!     println!("{} file(s) copied", organized.copied);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{
    CollectionError, ConfigError, KeepsakeError, PipelineError, PipelineResult, Result,
};
pub use output::{ReportFormat, ReportWriter};
pub use pipeline::{Curation, Orchestrator, StageObserver, WorkingSet};
pub use types::{
    CurationReport, MediaKind, MediaRecord, OrganizeReport, RecordAction, RecordEvent, StageKind,
    StageReport,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_orchestrator_uses_config() {
        let orchestrator = Orchestrator::new(Config::default());
        assert_eq!(orchestrator.config().processing.parallel_workers, 4);
    }
}
