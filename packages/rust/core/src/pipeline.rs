//! End-to-end `import` pipeline: CSV catalog → enrichment → libSQL table.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{info, instrument, warn};

use exoatlas_shared::{AppConfig, EnrichConfig, Result};
use exoatlas_storage::Storage;
use exoatlas_wiki::{ArticleSource, WikiClient};

use crate::enrichment::{EnrichmentProgress, EnrichmentStats, Enricher};

/// Configuration for the import pipeline.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// CSV catalog to read.
    pub catalog_path: PathBuf,
    /// Database to (re)write.
    pub database_path: PathBuf,
    /// Resolver, extractor, and filter settings.
    pub enrich: EnrichConfig,
}

impl From<&AppConfig> for ImportConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            catalog_path: PathBuf::from(&config.defaults.catalog_path),
            database_path: PathBuf::from(&config.defaults.database_path),
            enrich: EnrichConfig::from(config),
        }
    }
}

/// Result of one import.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    /// Import run ledger ID.
    pub run_id: String,
    /// Records read from the catalog.
    pub catalog_records: usize,
    /// Rows written to the store (enriched records only).
    pub stored: usize,
    pub stats: EnrichmentStats,
    pub elapsed: Duration,
}

/// Run the import against the configured summary endpoint.
pub async fn import_catalog(
    config: &ImportConfig,
    progress: &dyn EnrichmentProgress,
) -> Result<ImportSummary> {
    config.enrich.validate()?;
    let client = WikiClient::new(&config.enrich.summary_endpoint, config.enrich.timeout_secs)?;
    import_catalog_with(client, config, progress).await
}

/// Run the import against any [`ArticleSource`].
///
/// 1. Read the catalog (fatal on any error, before any lookup)
/// 2. Open the store and open an import run
/// 3. Enrich every record
/// 4. Replace the table with the enriched records
/// 5. Close the import run with its stats
#[instrument(skip_all, fields(catalog = %config.catalog_path.display(), db = %config.database_path.display()))]
pub async fn import_catalog_with<S: ArticleSource + 'static>(
    source: S,
    config: &ImportConfig,
    progress: &dyn EnrichmentProgress,
) -> Result<ImportSummary> {
    let start = Instant::now();
    let enricher = Enricher::from_config(source, &config.enrich)?;

    // --- Phase 1: Catalog ---
    progress.phase("Reading catalog");
    let catalog = exoatlas_catalog::read_catalog(&config.catalog_path)?;
    let catalog_records = catalog.len();

    // --- Phase 2: Storage ---
    progress.phase("Opening database");
    let storage = Storage::open(&config.database_path).await?;
    let run_id = storage
        .insert_import_run(&config.catalog_path.display().to_string())
        .await?;
    info!(%run_id, records = catalog_records, "starting import");

    // --- Phase 3: Enrichment ---
    progress.phase("Enriching records");
    let report = enricher.enrich(catalog.records, progress).await;
    let stats = report.stats.clone();
    let records = report.into_enriched();

    // --- Phase 4: Write ---
    progress.phase("Writing database");
    let stored = match storage.replace_catalog(&catalog.columns, &records).await {
        Ok(stored) => stored,
        Err(e) => {
            let failed = json!({ "status": "failed", "error": e.to_string(), "enrichment": stats });
            if let Err(ledger) = storage.finish_import_run(&run_id, &failed).await {
                warn!(%run_id, error = %ledger, "failed to close import run");
            }
            return Err(e);
        }
    };

    let run_stats = json!({
        "status": "completed",
        "catalog_records": catalog_records,
        "stored": stored,
        "enrichment": stats,
    });
    storage.finish_import_run(&run_id, &run_stats).await?;

    let summary = ImportSummary {
        run_id,
        catalog_records,
        stored,
        stats,
        elapsed: start.elapsed(),
    };
    info!(
        run_id = %summary.run_id,
        catalog_records = summary.catalog_records,
        stored = summary.stored,
        elapsed_ms = summary.elapsed.as_millis(),
        "import completed"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use exoatlas_storage::BrowseQuery;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::enrichment::SilentProgress;

    fn fixture(name: &str) -> String {
        let path = format!("../../../fixtures/json/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn test_config(server: &MockServer) -> ImportConfig {
        let mut app = AppConfig::default();
        app.defaults.catalog_path = "../../../fixtures/csv/exoplanets.fixture.csv".into();
        app.defaults.database_path = std::env::temp_dir()
            .join(format!("exoatlas_import_{}.db", Uuid::now_v7()))
            .display()
            .to_string();
        app.defaults.concurrency = 3;
        app.wiki.summary_endpoint = format!("{}/page/summary", server.uri());
        app.wiki.timeout_secs = Some(5);
        ImportConfig::from(&app)
    }

    #[tokio::test]
    async fn import_stores_only_enriched_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page/summary/Kepler-7_b_(exoplanet)"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(fixture("summary.kepler-7b.json")),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page/summary/HD_209458_b_(exoplanet)"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(fixture("summary.spectroscopy.json")),
            )
            .mount(&server)
            .await;

        let config = test_config(&server);
        let summary = import_catalog(&config, &SilentProgress).await.expect("import");

        assert_eq!(summary.catalog_records, 5);
        assert_eq!(summary.stored, 1);
        assert_eq!(summary.stats.enriched, 1);
        assert_eq!(summary.stats.rejected, 1);
        assert_eq!(summary.stats.unresolved, 3);

        let storage = Storage::open_readonly(&config.database_path).await.unwrap();
        assert_eq!(storage.count_planets(&BrowseQuery::default()).await.unwrap(), 1);

        let kepler = storage.get_planet("Kepler-7 b").await.unwrap().expect("stored");
        assert!(kepler.image_url.as_deref().unwrap().starts_with("https://"));
        assert_eq!(kepler.attribute("hostname"), Some("Kepler-7"));
        assert!(storage.get_planet("HD 209458 b").await.unwrap().is_none());

        let columns = storage.table_columns().await.unwrap();
        assert_eq!(columns.iter().filter(|c| *c == "description").count(), 1);

        let runs = storage.list_import_runs(1).await.unwrap();
        assert_eq!(runs[0].id, summary.run_id);
        assert_eq!(runs[0].stats.as_ref().unwrap()["stored"], 1);
    }

    #[tokio::test]
    async fn missing_catalog_fails_before_any_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut config = test_config(&server);
        config.catalog_path = PathBuf::from("../../../fixtures/csv/does-not-exist.csv");

        let err = import_catalog(&config, &SilentProgress).await.unwrap_err();
        assert!(err.to_string().contains("does-not-exist"));
        assert!(!config.database_path.exists());
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_up_front() {
        let server = MockServer::start().await;
        let mut config = test_config(&server);
        config.enrich.concurrency = 0;

        assert!(import_catalog(&config, &SilentProgress).await.is_err());
    }

    #[tokio::test]
    async fn id_column_fails_before_any_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(0)
            .mount(&server)
            .await;

        let csv = std::env::temp_dir().join(format!("exoatlas_catalog_{}.csv", Uuid::now_v7()));
        std::fs::write(&csv, "ID,pl_name,hostname\n1,Kepler-7 b,Kepler-7\n").unwrap();
        let mut config = test_config(&server);
        config.catalog_path = csv;

        let err = import_catalog(&config, &SilentProgress).await.unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[tokio::test]
    async fn stale_enrichment_columns_do_not_block_import() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page/summary/Kepler-7_b_(exoplanet)"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(fixture("summary.kepler-7b.json")),
            )
            .mount(&server)
            .await;

        let csv = std::env::temp_dir().join(format!("exoatlas_catalog_{}.csv", Uuid::now_v7()));
        std::fs::write(
            &csv,
            "pl_name,Description,hostname,Image_URL\nKepler-7 b,stale,Kepler-7,http://old\n",
        )
        .unwrap();
        let mut config = test_config(&server);
        config.catalog_path = csv;

        let summary = import_catalog(&config, &SilentProgress).await.expect("import");
        assert_eq!(summary.stored, 1);

        let storage = Storage::open_readonly(&config.database_path).await.unwrap();
        let kepler = storage.get_planet("Kepler-7 b").await.unwrap().expect("stored");
        assert_ne!(kepler.description.as_deref(), Some("stale"));
        assert!(kepler.image_url.as_deref().unwrap().starts_with("https://"));
    }
}
