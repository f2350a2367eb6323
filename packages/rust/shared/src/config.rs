//! Application configuration for ExoAtlas.
//!
//! User config lives at `~/.exoatlas/exoatlas.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ExoAtlasError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "exoatlas.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".exoatlas";

// ---------------------------------------------------------------------------
// Config structs (matching exoatlas.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Article service settings.
    #[serde(default)]
    pub wiki: WikiConfig,

    /// Relevance filter overrides.
    #[serde(default)]
    pub filter: FilterConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Path to the catalog CSV export.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// Path to the SQLite database the enriched catalog is written to.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Maximum number of records enriched concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Rows per page when browsing.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            database_path: default_database_path(),
            concurrency: default_concurrency(),
            per_page: default_per_page(),
        }
    }
}

fn default_catalog_path() -> String {
    "data/nasa_exoplanet_data.csv".into()
}
fn default_database_path() -> String {
    "data/exoplanets.db".into()
}
fn default_concurrency() -> u32 {
    10
}
fn default_per_page() -> u32 {
    10
}

/// `[wiki]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiConfig {
    /// Base URL of the REST page-summary endpoint (title is appended).
    #[serde(default = "default_summary_endpoint")]
    pub summary_endpoint: String,

    /// Category qualifier appended to names for the exact-title lookup.
    #[serde(default = "default_title_qualifier")]
    pub title_qualifier: String,

    /// Base URI for synthesized placeholder images.
    #[serde(default = "default_placeholder_base")]
    pub placeholder_base: String,

    /// Per-request timeout. Unset means the transport default (none).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            summary_endpoint: default_summary_endpoint(),
            title_qualifier: default_title_qualifier(),
            placeholder_base: default_placeholder_base(),
            timeout_secs: None,
        }
    }
}

fn default_summary_endpoint() -> String {
    "https://en.wikipedia.org/api/rest_v1/page/summary".into()
}
fn default_title_qualifier() -> String {
    "exoplanet".into()
}
fn default_placeholder_base() -> String {
    "https://via.placeholder.com/300".into()
}

/// `[filter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Extra description exclusion terms, appended to the built-in list.
    #[serde(default)]
    pub extra_exclusion_terms: Vec<String>,

    /// Extra image URI keywords, appended to the built-in list.
    #[serde(default)]
    pub extra_image_keywords: Vec<String>,

    /// Terms of which at least one must appear in an accepted description.
    #[serde(default = "default_positive_markers")]
    pub positive_markers: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            extra_exclusion_terms: Vec::new(),
            extra_image_keywords: Vec::new(),
            positive_markers: default_positive_markers(),
        }
    }
}

fn default_positive_markers() -> Vec<String> {
    vec!["exoplanet".into(), "extrasolar".into()]
}

// ---------------------------------------------------------------------------
// Enrichment config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime enrichment configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// Worker pool width.
    pub concurrency: u32,
    /// REST page-summary endpoint.
    pub summary_endpoint: String,
    /// Qualifier for the exact-title lookup, e.g. `exoplanet`.
    pub title_qualifier: String,
    /// Placeholder image base URI.
    pub placeholder_base: String,
    /// Optional request timeout.
    pub timeout_secs: Option<u64>,
    /// Filter overrides.
    pub filter: FilterConfig,
}

impl From<&AppConfig> for EnrichConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: config.defaults.concurrency,
            summary_endpoint: config.wiki.summary_endpoint.clone(),
            title_qualifier: config.wiki.title_qualifier.clone(),
            placeholder_base: config.wiki.placeholder_base.clone(),
            timeout_secs: config.wiki.timeout_secs,
            filter: config.filter.clone(),
        }
    }
}

impl EnrichConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(ExoAtlasError::config("concurrency must be at least 1"));
        }
        if self.summary_endpoint.trim().is_empty() {
            return Err(ExoAtlasError::config("wiki.summary_endpoint is empty"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.exoatlas/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ExoAtlasError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.exoatlas/exoatlas.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ExoAtlasError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ExoAtlasError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ExoAtlasError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ExoAtlasError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ExoAtlasError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("catalog_path"));
        assert!(toml_str.contains("rest_v1/page/summary"));
        assert!(!toml_str.contains("timeout_secs"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
concurrency = 4

[wiki]
timeout_secs = 15

[filter]
extra_image_keywords = ["logo"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.concurrency, 4);
        assert_eq!(config.defaults.per_page, 10);
        assert_eq!(config.wiki.title_qualifier, "exoplanet");
        assert_eq!(config.wiki.timeout_secs, Some(15));
        assert_eq!(config.filter.extra_image_keywords, vec!["logo".to_string()]);
        assert_eq!(config.filter.positive_markers.len(), 2);
    }

    #[test]
    fn enrich_config_from_app_config() {
        let app = AppConfig::default();
        let enrich = EnrichConfig::from(&app);
        assert_eq!(enrich.concurrency, 10);
        assert_eq!(enrich.title_qualifier, "exoplanet");
        assert!(enrich.timeout_secs.is_none());
        assert!(enrich.validate().is_ok());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut enrich = EnrichConfig::from(&AppConfig::default());
        enrich.concurrency = 0;
        let err = enrich.validate().unwrap_err();
        assert!(err.to_string().contains("concurrency"));
    }
}
