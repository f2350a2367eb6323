//! Core orchestration for ExoAtlas: catalog enrichment and the import pipeline.

pub mod enrichment;
pub mod pipeline;

pub use enrichment::{
    EnrichmentOutcome, EnrichmentProgress, EnrichmentReport, EnrichmentStats, Enricher,
    SilentProgress,
};
pub use pipeline::{ImportConfig, ImportSummary, import_catalog, import_catalog_with};
