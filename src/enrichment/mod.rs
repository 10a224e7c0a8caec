//! # Enrichment
//!
//! Per-article annotation: summary, category, entities and sentiment, then a
//! relevance-weighted final score. Each stage asks the configured
//! [`EnrichmentCapability`] tiers first and falls back to the local
//! [`heuristics`], so enrichment degrades but never fails.

pub mod capability;
mod dedup;
pub mod heuristics;
pub mod pipeline;

pub use capability::{EnrichmentCapability, ExtractedInfo};
pub use pipeline::{
    sort_by_final_score, EnrichmentPipeline, PipelineOptions, PipelineState, Stage, StageError,
};
