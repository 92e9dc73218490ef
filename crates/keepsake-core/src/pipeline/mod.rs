//! Curation pipeline components.
//!
//! Stages run in a fixed order over a shrinking [`WorkingSet`]:
//! - **discovery**: Collect photo and video files under a root
//! - **validate**: Delete files that cannot be decoded
//! - **size_filter**: Delete files above the byte ceilings
//! - **normalize**: Convert HEIC/WebP to PNG and legacy containers to MP4
//! - **quality**: Delete media below the minimum resolution
//! - **dedup**: Delete near-duplicate images by perceptual hash
//! - **organize**: Copy survivors into a year/month tree
//! - **orchestrator**: Wires it all together

pub mod dedup;
pub mod discovery;
pub mod hash;
pub mod inspect;
pub mod normalize;
pub mod orchestrator;
pub mod organize;
pub mod quality;
pub mod size_filter;
pub mod stage;
pub mod validate;
pub mod working_set;

// Re-exports for convenient access
pub use dedup::{cluster, DuplicateDetector, DuplicateMatch, Partition};
pub use discovery::FileDiscovery;
pub use hash::{HashEngine, PerceptualHasher};
pub use inspect::{Inspection, MediaInspector, ProbeInspector};
pub use normalize::{MediaTranscoder, NormalizeStage, TargetFormat, Transcoder};
pub use orchestrator::{Curation, Orchestrator};
pub use organize::ChronologicalOrganizer;
pub use quality::QualityFilter;
pub use size_filter::SizeFilter;
pub use stage::{NoopObserver, Stage, StageObserver, StageOutcome};
pub use validate::ValidateStage;
pub use working_set::WorkingSet;
