//! Article resolution: map a catalog object name to the best-matching article.
//!
//! Each [`ResolutionStrategy`] proposes one candidate title for a name. The
//! [`ResolverChain`] tries its strategies in priority order and stops at the
//! first title the service answers with a usable summary.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::ArticleSource;

/// An article title that answered for an object name, plus its payload.
#[derive(Debug, Clone)]
pub struct ResolutionCandidate {
    /// Catalog object name the lookup started from.
    pub object_name: String,
    /// Title that was looked up.
    pub title: String,
    /// Name of the strategy that proposed the title.
    pub strategy: String,
    /// Raw summary payload returned for `title`.
    pub payload: Value,
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Proposes an article title for an object name.
pub trait ResolutionStrategy: Send + Sync {
    /// Human-readable strategy name for tracing.
    fn name(&self) -> &str;

    /// Title to look up, or `None` when the strategy does not apply.
    fn candidate_title(&self, object_name: &str) -> Option<String>;
}

/// Exact title in the qualifier's category: `"Kepler-7 b (exoplanet)"`.
pub struct QualifiedTitle {
    qualifier: String,
}

impl QualifiedTitle {
    pub fn new(qualifier: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.into(),
        }
    }
}

impl ResolutionStrategy for QualifiedTitle {
    fn name(&self) -> &str {
        "qualified"
    }

    fn candidate_title(&self, object_name: &str) -> Option<String> {
        let qualifier = self.qualifier.trim();
        if qualifier.is_empty() {
            return None;
        }
        Some(format!("{object_name} ({qualifier})"))
    }
}

/// The bare object name.
pub struct BareTitle;

impl ResolutionStrategy for BareTitle {
    fn name(&self) -> &str {
        "bare"
    }

    fn candidate_title(&self, object_name: &str) -> Option<String> {
        Some(object_name.to_string())
    }
}

/// The name with the space before a trailing planet letter removed:
/// `"Kepler-7 b"` becomes `"Kepler-7b"`.
pub struct CompactTitle;

impl ResolutionStrategy for CompactTitle {
    fn name(&self) -> &str {
        "compact"
    }

    fn candidate_title(&self, object_name: &str) -> Option<String> {
        static LETTER_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"^(.*\S)\s+([a-z])$").expect("valid regex"));

        LETTER_RE
            .captures(object_name)
            .map(|caps| format!("{}{}", &caps[1], &caps[2]))
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Holds resolution strategies in priority order.
pub struct ResolverChain {
    strategies: Vec<Box<dyn ResolutionStrategy>>,
}

impl ResolverChain {
    /// Default chain: qualified title, bare name, compact name.
    pub fn new(qualifier: &str) -> Self {
        Self::with_strategies(vec![
            Box::new(QualifiedTitle::new(qualifier)),
            Box::new(BareTitle),
            Box::new(CompactTitle),
        ])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn ResolutionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Find the first strategy whose title yields a usable summary.
    ///
    /// Transport failures are logged and count as a miss for that strategy.
    /// Returns `None` when every strategy misses.
    pub async fn resolve<S: ArticleSource>(
        &self,
        source: &S,
        object_name: &str,
    ) -> Option<ResolutionCandidate> {
        let object_name = object_name.trim();
        if object_name.is_empty() {
            return None;
        }

        let mut tried: Vec<String> = Vec::new();

        for strategy in &self.strategies {
            let Some(title) = strategy.candidate_title(object_name) else {
                continue;
            };
            if tried.contains(&title) {
                continue;
            }

            debug!(object_name, %title, strategy = strategy.name(), "looking up article");
            match source.fetch_summary(&title).await {
                Ok(Some(payload)) if is_usable(&payload) => {
                    debug!(object_name, %title, strategy = strategy.name(), "article resolved");
                    return Some(ResolutionCandidate {
                        object_name: object_name.to_string(),
                        title,
                        strategy: strategy.name().to_string(),
                        payload,
                    });
                }
                Ok(_) => {
                    debug!(object_name, %title, "no usable article");
                }
                Err(e) => {
                    warn!(object_name, %title, error = %e, "article lookup failed");
                }
            }
            tried.push(title);
        }

        info!(object_name, attempts = tried.len(), "unresolved");
        None
    }
}

/// A summary is usable when it has text and is not a disambiguation page.
fn is_usable(payload: &Value) -> bool {
    let is_disambiguation = payload.get("type").and_then(Value::as_str) == Some("disambiguation");
    let has_extract = payload
        .get("extract")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty());
    has_extract && !is_disambiguation
}
