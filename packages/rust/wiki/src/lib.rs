//! Article resolution and content extraction against a Wikipedia-style
//! REST page-summary service.
//!
//! This crate provides:
//! - [`WikiClient`]: HTTP client for `page/summary/{title}`
//! - [`ArticleSource`]: the seam the resolver fetches through
//! - [`ResolverChain`]: ordered [`ResolutionStrategy`] fallbacks
//! - [`ContentExtractor`]: description + image extraction, placeholder images

pub mod client;
pub mod extract;
pub mod resolver;

pub use client::{ArticleSource, WikiClient};
pub use extract::{ContentExtractor, ExtractionResult, normalize_https};
pub use resolver::{
    BareTitle, CompactTitle, QualifiedTitle, ResolutionCandidate, ResolutionStrategy,
    ResolverChain,
};
