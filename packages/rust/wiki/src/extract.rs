//! Content extraction from a resolved article summary.

use exoatlas_shared::PLACEHOLDER_SUFFIX;
use serde::Deserialize;
use url::Url;

use crate::resolver::ResolutionCandidate;

/// Description and image reference pulled from one article.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl ExtractionResult {
    /// Nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.image_url.is_none()
    }
}

/// Summary payload fields we read. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct SummaryPayload {
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    thumbnail: Option<ImageRef>,
    #[serde(default)]
    originalimage: Option<ImageRef>,
}

#[derive(Debug, Deserialize)]
struct ImageRef {
    source: String,
}

/// Turns resolved summaries into [`ExtractionResult`]s.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    placeholder_base: String,
}

impl ContentExtractor {
    /// `placeholder_base` prefixes every synthesized placeholder image.
    pub fn new(placeholder_base: impl Into<String>) -> Self {
        Self {
            placeholder_base: placeholder_base.into(),
        }
    }

    /// Extract description and image from a candidate.
    ///
    /// A payload that does not decode yields an empty result. A missing
    /// description also yields an empty result; a missing image is replaced
    /// by a placeholder.
    pub fn extract(&self, candidate: &ResolutionCandidate) -> ExtractionResult {
        let Ok(summary) = SummaryPayload::deserialize(&candidate.payload) else {
            return ExtractionResult::default();
        };

        let Some(description) = summary
            .extract
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
        else {
            return ExtractionResult::default();
        };

        let image_url = summary
            .thumbnail
            .into_iter()
            .chain(summary.originalimage)
            .find_map(|img| normalize_https(&img.source))
            .unwrap_or_else(|| self.placeholder_for(&candidate.object_name));

        ExtractionResult {
            description: Some(description),
            image_url: Some(image_url),
        }
    }

    /// Placeholder image reference encoding `object_name`.
    pub fn placeholder_for(&self, object_name: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(object_name.as_bytes()).collect();
        format!("{}?text={encoded}{PLACEHOLDER_SUFFIX}", self.placeholder_base)
    }
}

/// Upgrade an image URI to `https`. Protocol-relative URIs get the scheme
/// prepended; non-HTTP or unparseable URIs yield `None`.
pub fn normalize_https(uri: &str) -> Option<String> {
    let uri = uri.trim();
    let absolute = if uri.starts_with("//") {
        format!("https:{uri}")
    } else {
        uri.to_string()
    };

    let mut url = Url::parse(&absolute).ok()?;
    match url.scheme() {
        "https" => {}
        "http" => url.set_scheme("https").ok()?,
        _ => return None,
    }
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use exoatlas_shared::is_placeholder_image;
    use serde_json::{Value, json};

    const PLACEHOLDER_BASE: &str = "https://via.placeholder.com/300";

    fn candidate(payload: Value) -> ResolutionCandidate {
        ResolutionCandidate {
            object_name: "Kepler-7 b".into(),
            title: "Kepler-7 b (exoplanet)".into(),
            strategy: "qualified".into(),
            payload,
        }
    }

    fn fixture(name: &str) -> Value {
        let path = format!("../../../fixtures/json/{name}");
        let content = std::fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("missing fixture: {path}"));
        serde_json::from_str(&content).expect("fixture is JSON")
    }

    #[test]
    fn extracts_description_and_https_thumbnail() {
        let extractor = ContentExtractor::new(PLACEHOLDER_BASE);
        let result = extractor.extract(&candidate(fixture("summary.kepler-7b.json")));

        assert!(result.description.as_deref().unwrap().starts_with("Kepler-7b is one of"));
        let image = result.image_url.unwrap();
        assert!(image.starts_with("https://upload.wikimedia.org/"));
        assert!(image.contains("320px-Kepler-7b_artist_impression.jpg"));
    }

    #[test]
    fn missing_image_gets_placeholder() {
        let extractor = ContentExtractor::new(PLACEHOLDER_BASE);
        let result = extractor.extract(&candidate(json!({ "extract": "An exoplanet." })));

        let image = result.image_url.unwrap();
        assert_eq!(
            image,
            "https://via.placeholder.com/300?text=Kepler-7+b+Image+Not+Found"
        );
        assert!(is_placeholder_image(&image));
    }

    #[test]
    fn original_image_is_used_without_thumbnail() {
        let extractor = ContentExtractor::new(PLACEHOLDER_BASE);
        let result = extractor.extract(&candidate(json!({
            "extract": "An exoplanet.",
            "originalimage": { "source": "http://upload.wikimedia.org/a/b.jpg" }
        })));
        assert_eq!(result.image_url.as_deref(), Some("https://upload.wikimedia.org/a/b.jpg"));
    }

    #[test]
    fn empty_synopsis_yields_nothing() {
        let extractor = ContentExtractor::new(PLACEHOLDER_BASE);
        let result = extractor.extract(&candidate(json!({
            "extract": "   ",
            "thumbnail": { "source": "https://img.example/a.jpg" }
        })));
        assert!(result.is_empty());
    }

    #[test]
    fn malformed_payload_yields_nothing() {
        let extractor = ContentExtractor::new(PLACEHOLDER_BASE);
        let result = extractor.extract(&candidate(json!({
            "extract": "An exoplanet.",
            "thumbnail": "not-an-object"
        })));
        assert_eq!(result, ExtractionResult::default());

        let result = extractor.extract(&candidate(json!("just a string")));
        assert!(result.is_empty());
    }

    #[test]
    fn normalize_https_variants() {
        assert_eq!(
            normalize_https("//upload.wikimedia.org/x.jpg").as_deref(),
            Some("https://upload.wikimedia.org/x.jpg")
        );
        assert_eq!(
            normalize_https("http://img.example/x.jpg").as_deref(),
            Some("https://img.example/x.jpg")
        );
        assert_eq!(normalize_https("ftp://img.example/x.jpg"), None);
        assert_eq!(normalize_https("x.jpg"), None);
    }
}
