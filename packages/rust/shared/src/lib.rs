//! Shared types, error model, and configuration for ExoAtlas.
//!
//! This crate is the foundation depended on by all other ExoAtlas crates.
//! It provides:
//! - [`ExoAtlasError`]: the unified error type
//! - Domain types ([`Catalog`], [`CatalogRecord`], [`CatalogColumn`])
//! - Configuration ([`AppConfig`], [`EnrichConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, EnrichConfig, FilterConfig, WikiConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{ExoAtlasError, Result};
pub use types::{
    Catalog, CatalogColumn, CatalogRecord, ColumnKind, DESCRIPTION_COLUMN, ID_COLUMN,
    IMAGE_URL_COLUMN, NAME_COLUMN, PLACEHOLDER_SUFFIX, is_generated_column, is_placeholder_image,
};
