//! libSQL storage layer for the enriched exoplanet catalog (offline mode).
//!
//! The [`Storage`] struct wraps a libSQL database holding the `exoplanets`
//! table and the import run ledger.
//!
//! **Access rules:**
//! - `exoatlas import`: read-write (sole writer) via [`Storage::open`]
//! - browsing commands: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::Utc;
use exoatlas_shared::{
    CatalogColumn, CatalogRecord, ColumnKind, DESCRIPTION_COLUMN, ExoAtlasError, ID_COLUMN,
    IMAGE_URL_COLUMN, NAME_COLUMN, PLACEHOLDER_SUFFIX, Result, is_generated_column,
};
use libsql::params::Params;
use libsql::{Connection, Database, Row, Value, params};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Table holding the enriched catalog.
pub const PLANETS_TABLE: &str = "exoplanets";

/// Searched alongside the object name when present.
const HOST_COLUMN: &str = "hostname";

const METHOD_COLUMN: &str = "discoverymethod";

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ExoAtlasError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ExoAtlasError::Storage(format!(
                "database not found: {} (run `exoatlas import` first)",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        ExoAtlasError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(ExoAtlasError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Catalog replacement
    // -----------------------------------------------------------------------

    /// Replace the `exoplanets` table with `records`.
    ///
    /// The table is dropped and recreated from `columns`, so its shape always
    /// follows the latest catalog. Everything happens in one transaction: on
    /// any failure the previous table is left untouched.
    #[instrument(skip_all, fields(columns = columns.len(), records = records.len()))]
    pub async fn replace_catalog(
        &self,
        columns: &[CatalogColumn],
        records: &[CatalogRecord],
    ) -> Result<usize> {
        self.check_writable()?;
        check_columns(columns)?;

        let tx = self.conn.transaction().await.map_err(storage_err)?;
        match write_catalog(&tx, columns, records).await {
            Ok(written) => {
                tx.commit().await.map_err(storage_err)?;
                info!(rows = written, "catalog table replaced");
                Ok(written)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Import runs
    // -----------------------------------------------------------------------

    /// Record the start of an import. Returns the run ID.
    pub async fn insert_import_run(&self, source: &str) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO import_runs (id, source, started_at) VALUES (?1, ?2, ?3)",
                params![id.as_str(), source, now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(id)
    }

    /// Mark an import run finished and attach its statistics.
    pub async fn finish_import_run(&self, id: &str, stats: &serde_json::Value) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let stats_json = serde_json::to_string(stats)
            .map_err(|e| ExoAtlasError::Storage(format!("failed to encode run stats: {e}")))?;
        let updated = self
            .conn
            .execute(
                "UPDATE import_runs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json.as_str(), id],
            )
            .await
            .map_err(storage_err)?;
        if updated == 0 {
            return Err(ExoAtlasError::Storage(format!("unknown import run: {id}")));
        }
        Ok(())
    }

    /// Most recent import runs first.
    pub async fn list_import_runs(&self, limit: u32) -> Result<Vec<ImportRun>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, source, started_at, finished_at, stats_json
                 FROM import_runs ORDER BY started_at DESC, id DESC LIMIT ?1",
                params![i64::from(limit)],
            )
            .await
            .map_err(storage_err)?;

        let mut runs = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            let stats_json: Option<String> = row.get(4).ok();
            runs.push(ImportRun {
                id: row.get(0).map_err(storage_err)?,
                source: row.get(1).map_err(storage_err)?,
                started_at: row.get(2).map_err(storage_err)?,
                finished_at: row.get(3).ok(),
                stats: stats_json.and_then(|s| serde_json::from_str(&s).ok()),
            });
        }
        Ok(runs)
    }

    // -----------------------------------------------------------------------
    // Browse queries
    // -----------------------------------------------------------------------

    /// Column names of the `exoplanets` table, in table order.
    ///
    /// Empty when no catalog has been imported yet.
    pub async fn table_columns(&self) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(&format!("PRAGMA table_info({PLANETS_TABLE})"), params![])
            .await
            .map_err(storage_err)?;

        let mut columns = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            columns.push(row.get::<String>(1).map_err(storage_err)?);
        }
        Ok(columns)
    }

    /// Number of rows matching `query` (paging ignored).
    pub async fn count_planets(&self, query: &BrowseQuery) -> Result<u64> {
        let columns = self.table_columns().await?;
        if columns.is_empty() {
            return Ok(0);
        }

        let (filter, values) = browse_filter(query, &columns);
        let sql = format!("SELECT COUNT(*) FROM {PLANETS_TABLE}{filter}");
        let mut rows = self
            .conn
            .query(&sql, Params::Positional(values))
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => {
                let count = row.get::<i64>(0).map_err(storage_err)?;
                Ok(u64::try_from(count).unwrap_or(0))
            }
            None => Ok(0),
        }
    }

    /// One page of rows matching `query`, in import order.
    pub async fn list_planets(&self, query: &BrowseQuery) -> Result<Vec<StoredPlanet>> {
        let columns = self.table_columns().await?;
        if columns.is_empty() {
            return Ok(Vec::new());
        }

        let (filter, mut values) = browse_filter(query, &columns);
        values.push(Value::Integer(i64::from(query.limit)));
        let limit_idx = values.len();
        values.push(Value::Integer(i64::try_from(query.offset).unwrap_or(i64::MAX)));
        let offset_idx = values.len();

        let sql = format!(
            "SELECT * FROM {PLANETS_TABLE}{filter} ORDER BY {ID_COLUMN} LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
        );
        self.query_planets(&sql, values).await
    }

    /// Detail lookup by exact object name.
    pub async fn get_planet(&self, name: &str) -> Result<Option<StoredPlanet>> {
        if self.table_columns().await?.is_empty() {
            return Ok(None);
        }

        let sql = format!("SELECT * FROM {PLANETS_TABLE} WHERE {NAME_COLUMN} = ?1 LIMIT 1");
        let mut planets = self
            .query_planets(&sql, vec![Value::Text(name.trim().to_string())])
            .await?;
        Ok(planets.pop())
    }

    /// All rows whose discovery method equals `method` (case-insensitive).
    pub async fn planets_by_discovery_method(&self, method: &str) -> Result<Vec<StoredPlanet>> {
        let columns = self.table_columns().await?;
        if !columns.iter().any(|c| c == METHOD_COLUMN) {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT * FROM {PLANETS_TABLE} WHERE {METHOD_COLUMN} = ?1 COLLATE NOCASE ORDER BY {ID_COLUMN}"
        );
        self.query_planets(&sql, vec![Value::Text(method.trim().to_string())])
            .await
    }

    async fn query_planets(&self, sql: &str, values: Vec<Value>) -> Result<Vec<StoredPlanet>> {
        let mut rows = self
            .conn
            .query(sql, Params::Positional(values))
            .await
            .map_err(storage_err)?;

        let mut planets = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            planets.push(planet_from_row(&row)?);
        }
        Ok(planets)
    }
}

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// Filter and paging for [`Storage::list_planets`] / [`Storage::count_planets`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseQuery {
    /// Substring matched against the object name and host name.
    pub search: Option<String>,
    pub limit: u32,
    pub offset: u64,
    /// Only rows with a real (non-placeholder) image.
    pub photos_only: bool,
}

impl Default for BrowseQuery {
    fn default() -> Self {
        Self {
            search: None,
            limit: 10,
            offset: 0,
            photos_only: false,
        }
    }
}

impl BrowseQuery {
    /// Query for 1-based `page` of `per_page` rows.
    pub fn page(search: Option<String>, page: u32, per_page: u32) -> Self {
        let per_page = per_page.max(1);
        Self {
            search,
            limit: per_page,
            offset: u64::from(page.saturating_sub(1)) * u64::from(per_page),
            photos_only: false,
        }
    }
}

/// A row of the `exoplanets` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredPlanet {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Pass-through columns in table order; NULL values are omitted.
    pub attributes: Vec<(String, String)>,
}

impl StoredPlanet {
    pub fn attribute(&self, column: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }
}

/// A row of the `import_runs` ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRun {
    pub id: String,
    pub source: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub stats: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn storage_err(e: libsql::Error) -> ExoAtlasError {
    ExoAtlasError::Storage(e.to_string())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn check_columns(columns: &[CatalogColumn]) -> Result<()> {
    if !columns.iter().any(|c| c.name == NAME_COLUMN) {
        return Err(ExoAtlasError::validation(format!(
            "catalog has no '{NAME_COLUMN}' column"
        )));
    }
    if let Some(clash) = columns.iter().find(|c| is_generated_column(&c.name)) {
        return Err(ExoAtlasError::validation(format!(
            "catalog column '{}' clashes with a generated column",
            clash.name
        )));
    }
    Ok(())
}

async fn write_catalog(
    conn: &Connection,
    columns: &[CatalogColumn],
    records: &[CatalogRecord],
) -> Result<usize> {
    let mut ddl = format!(
        "DROP TABLE IF EXISTS {PLANETS_TABLE};\nCREATE TABLE {PLANETS_TABLE} (\n    {ID_COLUMN} INTEGER PRIMARY KEY"
    );
    for column in columns {
        ddl.push_str(&format!(
            ",\n    {} {}",
            quote_ident(&column.name),
            column.kind.sql_type()
        ));
    }
    ddl.push_str(&format!(
        ",\n    {DESCRIPTION_COLUMN} TEXT,\n    {IMAGE_URL_COLUMN} TEXT\n);\n\
         CREATE INDEX idx_{PLANETS_TABLE}_name ON {PLANETS_TABLE}({NAME_COLUMN});"
    ));
    conn.execute_batch(&ddl).await.map_err(storage_err)?;

    let names: Vec<String> = columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .chain([DESCRIPTION_COLUMN.to_string(), IMAGE_URL_COLUMN.to_string()])
        .collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
    let insert = format!(
        "INSERT INTO {PLANETS_TABLE} ({}) VALUES ({})",
        names.join(", "),
        placeholders.join(", ")
    );

    for record in records {
        if record.attributes.len() != columns.len() {
            return Err(ExoAtlasError::validation(format!(
                "record '{}' has {} values for {} columns",
                record.name,
                record.attributes.len(),
                columns.len()
            )));
        }

        let mut values: Vec<Value> = columns
            .iter()
            .zip(&record.attributes)
            .map(|(column, raw)| bind_value(column.kind, raw))
            .collect();
        values.push(optional_text(record.description.as_deref()));
        values.push(optional_text(record.image_url.as_deref()));

        conn.execute(&insert, Params::Positional(values))
            .await
            .map_err(storage_err)?;
    }
    Ok(records.len())
}

/// Bind a raw catalog value per its column kind. Empty or unparseable
/// numeric values become NULL.
fn bind_value(kind: ColumnKind, raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return Value::Null;
    }
    match kind {
        ColumnKind::Integer => raw.parse::<i64>().map_or(Value::Null, Value::Integer),
        ColumnKind::Real => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map_or(Value::Null, Value::Real),
        ColumnKind::Text => Value::Text(raw.to_string()),
    }
}

fn optional_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |v| Value::Text(v.to_string()))
}

/// WHERE clause and positional values for a browse query.
fn browse_filter(query: &BrowseQuery, columns: &[String]) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        values.push(Value::Text(format!("%{}%", escape_like(search))));
        let idx = values.len();
        if columns.iter().any(|c| c == HOST_COLUMN) {
            conditions.push(format!(
                "({NAME_COLUMN} LIKE ?{idx} ESCAPE '\\' OR {HOST_COLUMN} LIKE ?{idx} ESCAPE '\\')"
            ));
        } else {
            conditions.push(format!("{NAME_COLUMN} LIKE ?{idx} ESCAPE '\\'"));
        }
    }

    if query.photos_only {
        // Same test as `is_placeholder_image`.
        values.push(Value::Text(format!("%{}", escape_like(PLACEHOLDER_SUFFIX))));
        let idx = values.len();
        conditions.push(format!(
            "{IMAGE_URL_COLUMN} IS NOT NULL AND {IMAGE_URL_COLUMN} NOT LIKE ?{idx} ESCAPE '\\'"
        ));
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

/// Escape `LIKE` wildcards so `raw` matches literally under `ESCAPE '\'`.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn planet_from_row(row: &Row) -> Result<StoredPlanet> {
    let mut planet = StoredPlanet::default();
    for idx in 0..row.column_count() {
        let Some(column) = row.column_name(idx) else {
            continue;
        };
        let text = match row.get_value(idx).map_err(storage_err)? {
            Value::Null => None,
            Value::Integer(v) => Some(v.to_string()),
            Value::Real(v) => Some(v.to_string()),
            Value::Text(v) => Some(v),
            Value::Blob(v) => Some(format!("<{} bytes>", v.len())),
        };

        match column {
            ID_COLUMN => {}
            DESCRIPTION_COLUMN => planet.description = text,
            IMAGE_URL_COLUMN => planet.image_url = text,
            _ => {
                if column == NAME_COLUMN {
                    planet.name = text.clone().unwrap_or_default();
                }
                if let Some(text) = text {
                    planet.attributes.push((column.to_string(), text));
                }
            }
        }
    }
    Ok(planet)
}
