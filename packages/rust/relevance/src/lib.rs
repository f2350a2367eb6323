//! Keyword-based relevance filter for enriched catalog content.
//!
//! The article service returns photographs and artist impressions next to
//! diagrams and plots, and name lookups sometimes land on the wrong article.
//! This crate decides, without any I/O, whether an extracted description and
//! an extracted image reference are fit to store. The two halves are judged
//! independently; callers combine them.

mod keywords;

use exoatlas_shared::FilterConfig;
use tracing::debug;

pub use keywords::{DESCRIPTION_EXCLUSION_TERMS, IMAGE_EXCLUSION_KEYWORDS, POSITIVE_MARKERS};

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

/// Why a piece of content was accepted or rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerdictReason {
    /// Nothing to judge.
    Missing,
    /// Description contains an exclusion term.
    ExcludedTerm(String),
    /// Description contains none of the positive markers.
    NoPositiveMarker,
    /// Image URI contains an exclusion keyword.
    ExcludedKeyword(String),
    /// Description accepted on the strength of this marker.
    MatchedMarker(String),
    /// Image accepted: no keyword matched.
    Clean,
}

/// Accept/reject decision plus its reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterVerdict {
    pub accepted: bool,
    pub reason: VerdictReason,
}

impl FilterVerdict {
    fn accept(reason: VerdictReason) -> Self {
        Self {
            accepted: true,
            reason,
        }
    }

    fn reject(reason: VerdictReason) -> Self {
        Self {
            accepted: false,
            reason,
        }
    }
}

impl std::fmt::Display for FilterVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verdict = if self.accepted { "accepted" } else { "rejected" };
        match &self.reason {
            VerdictReason::Missing => write!(f, "{verdict}: missing"),
            VerdictReason::ExcludedTerm(t) => write!(f, "{verdict}: exclusion term `{t}`"),
            VerdictReason::NoPositiveMarker => write!(f, "{verdict}: no positive marker"),
            VerdictReason::ExcludedKeyword(k) => write!(f, "{verdict}: image keyword `{k}`"),
            VerdictReason::MatchedMarker(m) => write!(f, "{verdict}: marker `{m}`"),
            VerdictReason::Clean => write!(f, "{verdict}"),
        }
    }
}

// ---------------------------------------------------------------------------
// RelevanceFilter
// ---------------------------------------------------------------------------

/// Lower-cased term lists the filter matches against.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    exclusion_terms: Vec<String>,
    positive_markers: Vec<String>,
    image_keywords: Vec<String>,
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl RelevanceFilter {
    /// Filter with the built-in term lists.
    pub fn new() -> Self {
        Self {
            exclusion_terms: lowered(DESCRIPTION_EXCLUSION_TERMS.iter().copied()),
            positive_markers: lowered(POSITIVE_MARKERS.iter().copied()),
            image_keywords: lowered(IMAGE_EXCLUSION_KEYWORDS.iter().copied()),
        }
    }

    /// Built-in lists extended by the `[filter]` config section.
    ///
    /// Configured positive markers replace the built-in ones; an empty list
    /// keeps the built-ins.
    pub fn from_config(config: &FilterConfig) -> Self {
        let mut filter = Self::new();
        filter
            .exclusion_terms
            .extend(lowered(config.extra_exclusion_terms.iter().map(String::as_str)));
        filter
            .image_keywords
            .extend(lowered(config.extra_image_keywords.iter().map(String::as_str)));
        let markers = lowered(config.positive_markers.iter().map(String::as_str));
        if !markers.is_empty() {
            filter.positive_markers = markers;
        }
        debug!(
            exclusion_terms = filter.exclusion_terms.len(),
            positive_markers = filter.positive_markers.len(),
            image_keywords = filter.image_keywords.len(),
            "relevance filter configured"
        );
        filter
    }

    /// Judge a description: no exclusion term, at least one positive marker.
    pub fn judge_description(&self, text: Option<&str>) -> FilterVerdict {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return FilterVerdict::reject(VerdictReason::Missing);
        };
        let lower = text.to_lowercase();

        if let Some(term) = first_match(&lower, &self.exclusion_terms) {
            return FilterVerdict::reject(VerdictReason::ExcludedTerm(term.to_string()));
        }

        match first_match(&lower, &self.positive_markers) {
            Some(marker) => FilterVerdict::accept(VerdictReason::MatchedMarker(marker.to_string())),
            None => FilterVerdict::reject(VerdictReason::NoPositiveMarker),
        }
    }

    /// Judge an image reference: reject on any exclusion keyword.
    pub fn judge_image(&self, uri: Option<&str>) -> FilterVerdict {
        let Some(uri) = uri.map(str::trim).filter(|u| !u.is_empty()) else {
            return FilterVerdict::reject(VerdictReason::Missing);
        };
        let lower = uri.to_lowercase();

        match first_match(&lower, &self.image_keywords) {
            Some(keyword) => FilterVerdict::reject(VerdictReason::ExcludedKeyword(keyword.to_string())),
            None => FilterVerdict::accept(VerdictReason::Clean),
        }
    }

    pub fn accept_description(&self, text: Option<&str>) -> bool {
        self.judge_description(text).accepted
    }

    pub fn accept_image(&self, uri: Option<&str>) -> bool {
        self.judge_image(uri).accepted
    }
}

fn lowered<'a>(terms: impl Iterator<Item = &'a str>) -> Vec<String> {
    terms
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn first_match<'a>(haystack: &str, needles: &'a [String]) -> Option<&'a str> {
    needles
        .iter()
        .find(|n| haystack.contains(n.as_str()))
        .map(String::as_str)
}
