//! CLI enum types for the curate command.

use clap::ValueEnum;
use keepsake_core::config::{CollectionOrder, SimilarityMetric};
use keepsake_core::ReportFormat;

/// Distance-to-similarity conversion for duplicate detection.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Similarity {
    /// 1 - d/edge², edge = hash grid side (historical)
    Legacy,
    /// 1 - d/bits
    Normalized,
}

impl From<Similarity> for SimilarityMetric {
    fn from(value: Similarity) -> Self {
        match value {
            Similarity::Legacy => SimilarityMetric::Legacy,
            Similarity::Normalized => SimilarityMetric::Normalized,
        }
    }
}

/// Order in which collected files enter the pipeline.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Order {
    /// Sorted by full path
    Path,
    /// Directory walk order
    Traversal,
}

impl From<Order> for CollectionOrder {
    fn from(value: Order) -> Self {
        match value {
            Order::Path => CollectionOrder::Path,
            Order::Traversal => CollectionOrder::Traversal,
        }
    }
}

/// Report file formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReportFileFormat {
    /// Whole report as one JSON document
    Json,
    /// One record event per line
    Jsonl,
}

impl From<ReportFileFormat> for ReportFormat {
    fn from(value: ReportFileFormat) -> Self {
        match value {
            ReportFileFormat::Json => ReportFormat::Json,
            ReportFileFormat::Jsonl => ReportFormat::JsonLines,
        }
    }
}
