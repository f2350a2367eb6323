//! Catalog reader: loads the exoplanet archive CSV into an in-memory [`Catalog`].
//!
//! The archive export starts with `#` comment lines, followed by a header row
//! and one row per planet. Every column passes through untouched except the
//! enrichment-owned `description` / `image_url`, which are dropped if present
//! in any letter case. An `id` column is rejected since the store owns it.
//! Column storage kinds are inferred from the values so the store can declare
//! numeric columns as numeric.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info, instrument, warn};

use exoatlas_shared::{
    Catalog, CatalogColumn, CatalogRecord, ColumnKind, ExoAtlasError, ID_COLUMN, NAME_COLUMN,
    Result, is_generated_column,
};

/// Read a catalog CSV file from disk.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_catalog(path: &Path) -> Result<Catalog> {
    let file = std::fs::File::open(path).map_err(|e| ExoAtlasError::io(path, e))?;
    let catalog = read_catalog_from(file)?;
    info!(
        records = catalog.records.len(),
        columns = catalog.columns.len(),
        "catalog loaded"
    );
    Ok(catalog)
}

/// Read a catalog from any CSV source.
pub fn read_catalog_from<R: Read>(source: R) -> Result<Catalog> {
    let mut reader = ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| ExoAtlasError::catalog(format!("failed to read header row: {e}")))?
        .clone();
    check_headers(&headers)?;

    let name_idx = headers
        .iter()
        .position(|h| h == NAME_COLUMN)
        .ok_or_else(|| ExoAtlasError::catalog(format!("missing required column `{NAME_COLUMN}`")))?;

    // Indices of the columns that pass through to the store.
    let mut kept: Vec<usize> = Vec::with_capacity(headers.len());
    for (i, header) in headers.iter().enumerate() {
        if is_generated_column(header) {
            debug!(column = header, "dropping enrichment column from catalog");
        } else {
            kept.push(i);
        }
    }

    let mut records: Vec<CatalogRecord> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for (row_idx, row) in reader.records().enumerate() {
        let row = row.map_err(|e| {
            ExoAtlasError::catalog(format!("malformed row {}: {e}", row_idx + 1))
        })?;

        let name = row.get(name_idx).unwrap_or("").to_string();
        if name.is_empty() {
            warn!(row = row_idx + 1, "row without object name, skipping");
            continue;
        }
        if !seen.insert(name.clone()) {
            warn!(%name, row = row_idx + 1, "duplicate object name, keeping first");
            continue;
        }

        let attributes = kept
            .iter()
            .map(|&i| row.get(i).unwrap_or("").to_string())
            .collect();
        records.push(CatalogRecord::new(name, attributes));
    }

    let columns = kept
        .iter()
        .enumerate()
        .map(|(pos, &i)| CatalogColumn {
            name: headers.get(i).unwrap_or("").to_string(),
            kind: infer_kind(&records, pos),
        })
        .collect::<Vec<_>>();

    debug!(?columns, "inferred column kinds");

    Ok(Catalog { columns, records })
}

/// Reject header rows the store could not represent.
fn check_headers(headers: &StringRecord) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for header in headers.iter() {
        if header.is_empty() {
            return Err(ExoAtlasError::catalog("empty column name in header row"));
        }
        if header.eq_ignore_ascii_case(ID_COLUMN) {
            return Err(ExoAtlasError::catalog(format!(
                "column `{header}` is reserved for the generated row id"
            )));
        }
        if !seen.insert(header.to_ascii_lowercase()) {
            return Err(ExoAtlasError::catalog(format!(
                "duplicate column `{header}` in header row"
            )));
        }
    }
    Ok(())
}

/// Infer the storage kind of the column at `pos` from its non-empty values.
fn infer_kind(records: &[CatalogRecord], pos: usize) -> ColumnKind {
    let mut values = records
        .iter()
        .filter_map(|r| r.attributes.get(pos))
        .filter(|v| !v.is_empty())
        .peekable();

    if values.peek().is_none() {
        return ColumnKind::Text;
    }

    let mut kind = ColumnKind::Integer;
    for value in values {
        if kind == ColumnKind::Integer && value.parse::<i64>().is_ok() {
            continue;
        }
        match value.parse::<f64>() {
            Ok(v) if v.is_finite() => kind = ColumnKind::Real,
            _ => return ColumnKind::Text,
        }
    }
    kind
}
