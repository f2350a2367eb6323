//! Core domain types for the exoplanet catalog.

use serde::{Deserialize, Serialize};

/// Catalog field holding the unique object name.
pub const NAME_COLUMN: &str = "pl_name";

/// Column the enriched description is stored in.
pub const DESCRIPTION_COLUMN: &str = "description";

/// Column the enriched image reference is stored in.
pub const IMAGE_URL_COLUMN: &str = "image_url";

/// Surrogate key the store generates for every row.
pub const ID_COLUMN: &str = "id";

/// Every synthesized placeholder image reference ends with this suffix.
pub const PLACEHOLDER_SUFFIX: &str = "+Image+Not+Found";

/// Whether `uri` is a synthesized placeholder rather than a real image.
///
/// The store's photo filter matches the same suffix in SQL.
pub fn is_placeholder_image(uri: &str) -> bool {
    uri.ends_with(PLACEHOLDER_SUFFIX)
}

/// Column names the store generates itself. Matched case-insensitively,
/// since SQLite identifiers are.
pub fn is_generated_column(name: &str) -> bool {
    [ID_COLUMN, DESCRIPTION_COLUMN, IMAGE_URL_COLUMN]
        .iter()
        .any(|g| name.eq_ignore_ascii_case(g))
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// Storage affinity inferred for a pass-through catalog column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
}

impl ColumnKind {
    /// SQL type name used when declaring the column.
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }
}

/// A pass-through catalog column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogColumn {
    pub name: String,
    pub kind: ColumnKind,
}

// ---------------------------------------------------------------------------
// CatalogRecord
// ---------------------------------------------------------------------------

/// One catalog object, identified by its object name.
///
/// `attributes` holds the raw values of every pass-through column, in the
/// owning [`Catalog`]'s column order. An empty string stands for a missing
/// value. `description` and `image_url` are set by enrichment, always both or
/// neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Unique object name (`pl_name`).
    pub name: String,
    /// Raw pass-through values, aligned with the catalog columns.
    pub attributes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl CatalogRecord {
    /// Create an unenriched record.
    pub fn new(name: impl Into<String>, attributes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            attributes,
            description: None,
            image_url: None,
        }
    }

    /// Set both enrichment fields at once.
    pub fn enrich(&mut self, description: String, image_url: String) {
        self.description = Some(description);
        self.image_url = Some(image_url);
    }

    /// Clear both enrichment fields.
    pub fn clear_enrichment(&mut self) {
        self.description = None;
        self.image_url = None;
    }

    /// Whether the record carries a complete enrichment.
    pub fn is_enriched(&self) -> bool {
        self.description.is_some() && self.image_url.is_some()
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// An in-memory catalog table: columns plus one record per object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub columns: Vec<CatalogColumn>,
    pub records: Vec<CatalogRecord>,
}

impl Catalog {
    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
