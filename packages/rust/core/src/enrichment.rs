//! Enrichment orchestrator.
//!
//! Runs resolve → extract → filter for every unique object name on a bounded
//! worker pool and merges the accepted content back into the records.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use exoatlas_relevance::RelevanceFilter;
use exoatlas_shared::{CatalogRecord, EnrichConfig, Result};
use exoatlas_wiki::{ArticleSource, ContentExtractor, ResolverChain};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What happened to one object name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    /// Content accepted and attached.
    Enriched { title: String, strategy: String },
    /// No strategy produced a usable article.
    Unresolved,
    /// An article was found but its content failed the relevance filter.
    Rejected { reason: String },
    /// The worker task died before producing a result.
    Failed { error: String },
}

impl EnrichmentOutcome {
    pub fn is_enriched(&self) -> bool {
        matches!(self, Self::Enriched { .. })
    }
}

/// Result of one worker task.
#[derive(Debug, Clone)]
struct EnrichmentResult {
    outcome: EnrichmentOutcome,
    content: Option<(String, String)>,
}

impl EnrichmentResult {
    fn without_content(outcome: EnrichmentOutcome) -> Self {
        Self {
            outcome,
            content: None,
        }
    }
}

/// Per-outcome record counts for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentStats {
    pub total: usize,
    pub enriched: usize,
    pub unresolved: usize,
    pub rejected: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
}

impl EnrichmentStats {
    fn count(&mut self, outcome: &EnrichmentOutcome) {
        match outcome {
            EnrichmentOutcome::Enriched { .. } => self.enriched += 1,
            EnrichmentOutcome::Unresolved => self.unresolved += 1,
            EnrichmentOutcome::Rejected { .. } => self.rejected += 1,
            EnrichmentOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Records after enrichment, in input order, plus what happened to each name.
#[derive(Debug, Clone)]
pub struct EnrichmentReport {
    pub records: Vec<CatalogRecord>,
    pub outcomes: HashMap<String, EnrichmentOutcome>,
    pub stats: EnrichmentStats,
}

impl EnrichmentReport {
    pub fn outcome(&self, name: &str) -> Option<&EnrichmentOutcome> {
        self.outcomes.get(name)
    }

    /// Keep only the records that were enriched.
    pub fn into_enriched(self) -> Vec<CatalogRecord> {
        self.records.into_iter().filter(|r| r.is_enriched()).collect()
    }
}

// ---------------------------------------------------------------------------
// Progress trait
// ---------------------------------------------------------------------------

/// Progress callback for enrichment and import.
pub trait EnrichmentProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once per object name as its result is collected.
    fn record_done(&self, name: &str, current: usize, total: usize);
}

/// No-op progress for headless/test usage.
pub struct SilentProgress;

impl EnrichmentProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn record_done(&self, _name: &str, _current: usize, _total: usize) {}
}

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

/// Bounded-concurrency enrichment over an [`ArticleSource`].
pub struct Enricher<S> {
    source: Arc<S>,
    chain: Arc<ResolverChain>,
    extractor: Arc<ContentExtractor>,
    filter: Arc<RelevanceFilter>,
    concurrency: usize,
}

impl<S: ArticleSource + 'static> Enricher<S> {
    pub fn new(
        source: S,
        chain: ResolverChain,
        extractor: ContentExtractor,
        filter: RelevanceFilter,
        concurrency: usize,
    ) -> Self {
        Self {
            source: Arc::new(source),
            chain: Arc::new(chain),
            extractor: Arc::new(extractor),
            filter: Arc::new(filter),
            concurrency: concurrency.max(1),
        }
    }

    /// Build the default chain, extractor, and filter from `config`.
    pub fn from_config(source: S, config: &EnrichConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            source,
            ResolverChain::new(&config.title_qualifier),
            ContentExtractor::new(config.placeholder_base.clone()),
            RelevanceFilter::from_config(&config.filter),
            config.concurrency as usize,
        ))
    }

    /// Enrich `records`.
    ///
    /// Every record comes back, in input order, with enrichment either
    /// attached or cleared. Failures are contained per name.
    #[instrument(skip_all, fields(records = records.len(), concurrency = self.concurrency))]
    pub async fn enrich(
        &self,
        mut records: Vec<CatalogRecord>,
        progress: &dyn EnrichmentProgress,
    ) -> EnrichmentReport {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let mut seen = HashSet::new();
        let mut handles: Vec<(String, JoinHandle<EnrichmentResult>)> = Vec::new();

        for record in &records {
            if !seen.insert(record.name.clone()) {
                continue;
            }

            let name = record.name.clone();
            let sem = semaphore.clone();
            let source = self.source.clone();
            let chain = self.chain.clone();
            let extractor = self.extractor.clone();
            let filter = self.filter.clone();

            let handle = tokio::spawn(async move {
                let Ok(_permit) = sem.acquire().await else {
                    return EnrichmentResult::without_content(EnrichmentOutcome::Failed {
                        error: "worker pool closed".into(),
                    });
                };
                enrich_one(source.as_ref(), &chain, &extractor, &filter, &name).await
            });
            handles.push((record.name.clone(), handle));
        }

        // Collect results
        let total = handles.len();
        let mut results: HashMap<String, EnrichmentResult> = HashMap::with_capacity(total);
        for (current, (name, handle)) in handles.into_iter().enumerate() {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(object_name = %name, error = %e, "enrichment task failed");
                    EnrichmentResult::without_content(EnrichmentOutcome::Failed {
                        error: e.to_string(),
                    })
                }
            };
            progress.record_done(&name, current + 1, total);
            results.entry(name).or_insert(result);
        }

        // Merge back by name
        let mut stats = EnrichmentStats {
            total: records.len(),
            ..EnrichmentStats::default()
        };
        for record in &mut records {
            record.clear_enrichment();
            let Some(result) = results.get(&record.name) else {
                continue;
            };
            stats.count(&result.outcome);
            if let Some((description, image_url)) = &result.content {
                record.enrich(description.clone(), image_url.clone());
            }
        }
        let elapsed = start.elapsed();
        stats.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        info!(
            total = stats.total,
            enriched = stats.enriched,
            unresolved = stats.unresolved,
            rejected = stats.rejected,
            failed = stats.failed,
            elapsed_ms = stats.elapsed_ms,
            "enrichment completed"
        );

        let outcomes = results
            .into_iter()
            .map(|(name, result)| (name, result.outcome))
            .collect();

        EnrichmentReport {
            records,
            outcomes,
            stats,
        }
    }
}

/// Resolve, extract, and filter one name.
async fn enrich_one<S: ArticleSource>(
    source: &S,
    chain: &ResolverChain,
    extractor: &ContentExtractor,
    filter: &RelevanceFilter,
    name: &str,
) -> EnrichmentResult {
    let Some(candidate) = chain.resolve(source, name).await else {
        return EnrichmentResult::without_content(EnrichmentOutcome::Unresolved);
    };

    let extracted = extractor.extract(&candidate);
    if extracted.is_empty() {
        debug!(object_name = name, title = %candidate.title, "nothing extracted");
        return EnrichmentResult::without_content(EnrichmentOutcome::Rejected {
            reason: "nothing extracted".into(),
        });
    }
    // The extractor sets both fields or neither.
    let (Some(description), Some(image_url)) = (extracted.description, extracted.image_url)
    else {
        return EnrichmentResult::without_content(EnrichmentOutcome::Rejected {
            reason: "incomplete extraction".into(),
        });
    };

    let verdict = filter.judge_description(Some(&description));
    if !verdict.accepted {
        debug!(object_name = name, %verdict, "description filtered");
        return EnrichmentResult::without_content(EnrichmentOutcome::Rejected {
            reason: format!("description {verdict}"),
        });
    }
    debug!(object_name = name, %verdict, "description accepted");

    let verdict = filter.judge_image(Some(&image_url));
    if !verdict.accepted {
        debug!(object_name = name, %verdict, "image filtered");
        return EnrichmentResult::without_content(EnrichmentOutcome::Rejected {
            reason: format!("image {verdict}"),
        });
    }
    debug!(object_name = name, %verdict, "image accepted");

    EnrichmentResult {
        outcome: EnrichmentOutcome::Enriched {
            title: candidate.title,
            strategy: candidate.strategy,
        },
        content: Some((description, image_url)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use exoatlas_relevance::IMAGE_EXCLUSION_KEYWORDS;
    use exoatlas_shared::ExoAtlasError;
    use serde_json::{Value, json};

    const PLACEHOLDER_BASE: &str = "https://via.placeholder.com/300";

    /// In-memory source with optional latency, panics, and in-flight tracking.
    #[derive(Default)]
    struct FakeSource {
        answers: HashMap<String, Value>,
        failing: HashSet<String>,
        panicking: HashSet<String>,
        delay_ms: u64,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        asked: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn answer(mut self, title: &str, payload: Value) -> Self {
            self.answers.insert(title.to_string(), payload);
            self
        }

        fn failing(mut self, title: &str) -> Self {
            self.failing.insert(title.to_string());
            self
        }

        fn panicking(mut self, title: &str) -> Self {
            self.panicking.insert(title.to_string());
            self
        }

        fn with_delay(mut self, delay_ms: u64) -> Self {
            self.delay_ms = delay_ms;
            self
        }
    }

    impl ArticleSource for FakeSource {
        async fn fetch_summary(&self, title: &str) -> Result<Option<Value>> {
            self.asked.lock().unwrap().push(title.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.panicking.contains(title) {
                panic!("source blew up on {title}");
            }
            if self.failing.contains(title) {
                return Err(ExoAtlasError::Network(format!("{title}: connection reset")));
            }
            Ok(self.answers.get(title).cloned())
        }
    }

    fn fixture(name: &str) -> Value {
        let path = format!("../../../fixtures/json/{name}");
        let content = std::fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("missing fixture: {path}"));
        serde_json::from_str(&content).expect("fixture is JSON")
    }

    fn enricher(source: FakeSource, concurrency: usize) -> Enricher<FakeSource> {
        Enricher::new(
            source,
            ResolverChain::new("exoplanet"),
            ContentExtractor::new(PLACEHOLDER_BASE),
            RelevanceFilter::new(),
            concurrency,
        )
    }

    fn record(name: &str) -> CatalogRecord {
        CatalogRecord::new(name, vec![name.to_string()])
    }

    #[tokio::test]
    async fn kepler_7b_is_enriched_with_https_image() {
        let source = FakeSource::default()
            .answer("Kepler-7 b (exoplanet)", fixture("summary.kepler-7b.json"));
        let report = enricher(source, 4)
            .enrich(vec![record("Kepler-7 b")], &SilentProgress)
            .await;

        let kepler = &report.records[0];
        assert!(kepler.description.as_deref().unwrap().contains("exoplanets"));
        let image = kepler.image_url.as_deref().unwrap();
        assert!(image.starts_with("https://"));
        assert!(image.ends_with("320px-Kepler-7b_artist_impression.jpg"));
        assert_eq!(
            report.outcome("Kepler-7 b"),
            Some(&EnrichmentOutcome::Enriched {
                title: "Kepler-7 b (exoplanet)".into(),
                strategy: "qualified".into(),
            })
        );
    }

    #[tokio::test]
    async fn spectroscopy_description_leaves_record_bare() {
        let source = FakeSource::default()
            .answer("HD 209458 b (exoplanet)", fixture("summary.spectroscopy.json"));
        let report = enricher(source, 4)
            .enrich(vec![record("HD 209458 b")], &SilentProgress)
            .await;

        let hd = &report.records[0];
        assert!(hd.description.is_none());
        assert!(hd.image_url.is_none());
        assert!(matches!(
            report.outcome("HD 209458 b"),
            Some(EnrichmentOutcome::Rejected { reason }) if reason.contains("spectroscopy")
        ));
        assert!(report.into_enriched().is_empty());
    }

    #[tokio::test]
    async fn double_miss_is_unresolved() {
        let source = FakeSource::default();
        let report = enricher(source, 4)
            .enrich(vec![record("Nowhere b")], &SilentProgress)
            .await;

        assert_eq!(report.outcome("Nowhere b"), Some(&EnrichmentOutcome::Unresolved));
        assert_eq!(report.stats.unresolved, 1);
        assert!(!report.records[0].is_enriched());
    }

    #[tokio::test]
    async fn diagram_image_rejects_whole_record() {
        let source = FakeSource::default().answer(
            "51 Pegasi b (exoplanet)",
            json!({
                "type": "standard",
                "extract": "51 Pegasi b is an extrasolar planet.",
                "thumbnail": {
                    "source": "//upload.wikimedia.org/wikipedia/commons/thumb/a/ab/Radial_velocity_diagram.svg/320px-Radial_velocity_diagram.svg.png"
                }
            }),
        );
        let report = enricher(source, 4)
            .enrich(vec![record("51 Pegasi b")], &SilentProgress)
            .await;

        let pegasi = &report.records[0];
        assert!(pegasi.description.is_none());
        assert!(pegasi.image_url.is_none());
        assert_eq!(report.stats.rejected, 1);
    }

    #[tokio::test]
    async fn undecodable_summary_is_rejected() {
        let source = FakeSource::default().answer(
            "TrES-3 b (exoplanet)",
            json!({
                "type": "standard",
                "extract": "TrES-3 b is an exoplanet.",
                "thumbnail": "not-an-object"
            }),
        );
        let report = enricher(source, 4)
            .enrich(vec![record("TrES-3 b")], &SilentProgress)
            .await;

        assert_eq!(
            report.outcome("TrES-3 b"),
            Some(&EnrichmentOutcome::Rejected {
                reason: "nothing extracted".into()
            })
        );
        assert!(!report.records[0].is_enriched());
    }

    #[tokio::test]
    async fn transport_failures_degrade_to_unresolved() {
        let source = FakeSource::default()
            .failing("TrES-3 b (exoplanet)")
            .failing("TrES-3 b")
            .failing("TrES-3b");
        let report = enricher(source, 4)
            .enrich(vec![record("TrES-3 b")], &SilentProgress)
            .await;
        assert_eq!(report.outcome("TrES-3 b"), Some(&EnrichmentOutcome::Unresolved));
    }

    #[tokio::test]
    async fn panicking_task_only_fails_its_record() {
        let source = FakeSource::default()
            .answer("Kepler-7 b (exoplanet)", fixture("summary.kepler-7b.json"))
            .panicking("Doomed b (exoplanet)");
        let report = enricher(source, 2)
            .enrich(vec![record("Doomed b"), record("Kepler-7 b")], &SilentProgress)
            .await;

        assert!(matches!(
            report.outcome("Doomed b"),
            Some(EnrichmentOutcome::Failed { .. })
        ));
        assert!(report.outcome("Kepler-7 b").unwrap().is_enriched());
        assert_eq!(report.stats.failed, 1);
        assert_eq!(report.stats.enriched, 1);
    }

    #[tokio::test]
    async fn concurrency_bound_is_respected() {
        let source = FakeSource::default().with_delay(20);
        let enricher = enricher(source, 3);
        let records: Vec<_> = (0..12).map(|i| record(&format!("Planet-{i} b"))).collect();

        let report = enricher.enrich(records, &SilentProgress).await;
        assert_eq!(report.stats.total, 12);

        let max = enricher.source.max_in_flight.load(Ordering::SeqCst);
        assert!(max <= 3, "max in flight was {max}");
        assert!(max >= 2, "work never overlapped");
    }

    #[tokio::test]
    async fn output_preserves_records_and_order() {
        let source = FakeSource::default()
            .answer("Kepler-7 b (exoplanet)", fixture("summary.kepler-7b.json"));
        let names = ["Nowhere b", "Kepler-7 b", "Elsewhere c"];
        let records: Vec<_> = names.iter().map(|n| record(n)).collect();

        let report = enricher(source, 2).enrich(records, &SilentProgress).await;
        let out: Vec<&str> = report.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(out, names);

        let enriched = report.into_enriched();
        assert_eq!(enriched.len(), 1);
        assert_eq!(enriched[0].name, "Kepler-7 b");
    }

    #[tokio::test]
    async fn duplicate_names_are_fetched_once() {
        let source = FakeSource::default()
            .answer("Kepler-7 b (exoplanet)", fixture("summary.kepler-7b.json"));
        let enricher = enricher(source, 2);
        let report = enricher
            .enrich(vec![record("Kepler-7 b"), record("Kepler-7 b")], &SilentProgress)
            .await;

        assert_eq!(report.stats.total, 2);
        assert_eq!(report.stats.enriched, 2);
        assert_eq!(enricher.source.asked.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_enrichment_is_cleared() {
        let mut stale = record("Nowhere b");
        stale.enrich("An old exoplanet.".into(), "https://img.example/old.jpg".into());

        let report = enricher(FakeSource::default(), 1)
            .enrich(vec![stale], &SilentProgress)
            .await;
        assert!(!report.records[0].is_enriched());
    }

    #[tokio::test]
    async fn enrichment_is_idempotent() {
        let build = || {
            FakeSource::default()
                .answer("Kepler-7 b (exoplanet)", fixture("summary.kepler-7b.json"))
                .answer("HD 209458 b (exoplanet)", fixture("summary.spectroscopy.json"))
        };
        let records = || vec![record("Kepler-7 b"), record("HD 209458 b"), record("Nowhere b")];

        let first = enricher(build(), 3).enrich(records(), &SilentProgress).await;
        let second = enricher(build(), 3).enrich(first.records.clone(), &SilentProgress).await;

        assert_eq!(first.records, second.records);
        assert_eq!(first.stats.enriched, second.stats.enriched);
    }

    #[tokio::test]
    async fn stored_content_satisfies_filter() {
        let source = FakeSource::default()
            .answer("Kepler-7 b (exoplanet)", fixture("summary.kepler-7b.json"))
            .answer("HD 209458 b (exoplanet)", fixture("summary.spectroscopy.json"))
            .answer(
                "TrES-3 b",
                json!({ "type": "standard", "extract": "TrES-3b is a hot Jupiter exoplanet." }),
            )
            .answer("Fomalhaut b", json!({ "type": "standard", "extract": "Fomalhaut b is an exoplanet." }));
        let records = vec![
            record("Kepler-7 b"),
            record("HD 209458 b"),
            record("TrES-3 b"),
            record("Fomalhaut b"),
        ];

        let report = enricher(source, 4).enrich(records, &SilentProgress).await;
        let filter = RelevanceFilter::new();
        for r in &report.records {
            match (&r.description, &r.image_url) {
                (Some(desc), Some(image)) => {
                    assert!(filter.accept_description(Some(desc)));
                    let lower = image.to_lowercase();
                    assert!(IMAGE_EXCLUSION_KEYWORDS.iter().all(|k| !lower.contains(&k.to_lowercase())));
                }
                (None, None) => {}
                other => panic!("half-enriched record {}: {other:?}", r.name),
            }
        }

        // No image in the payload: placeholder passes the image filter.
        let fomalhaut = report.records.iter().find(|r| r.name == "Fomalhaut b").unwrap();
        assert!(fomalhaut.image_url.as_deref().unwrap().starts_with(PLACEHOLDER_BASE));
    }

    #[derive(Default)]
    struct CountingProgress {
        done: Mutex<Vec<(String, usize, usize)>>,
    }

    impl EnrichmentProgress for CountingProgress {
        fn phase(&self, _name: &str) {}
        fn record_done(&self, name: &str, current: usize, total: usize) {
            self.done.lock().unwrap().push((name.to_string(), current, total));
        }
    }

    #[tokio::test]
    async fn progress_sees_every_unique_name() {
        let progress = CountingProgress::default();
        enricher(FakeSource::default(), 2)
            .enrich(vec![record("A b"), record("B b"), record("A b")], &progress)
            .await;

        let done = progress.done.lock().unwrap();
        assert_eq!(done.len(), 2);
        assert_eq!(done.last().unwrap().1, 2);
        assert!(done.iter().all(|(_, _, total)| *total == 2));
    }

    #[test]
    fn from_config_rejects_zero_concurrency() {
        let config = EnrichConfig {
            concurrency: 0,
            ..EnrichConfig::from(&exoatlas_shared::AppConfig::default())
        };
        assert!(Enricher::from_config(FakeSource::default(), &config).is_err());
    }
}
