//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use exoatlas_core::{EnrichmentProgress, ImportConfig, import_catalog};
use exoatlas_shared::{AppConfig, init_config, is_placeholder_image, load_config};
use exoatlas_storage::{BrowseQuery, Storage, StoredPlanet};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ExoAtlas: an enriched, browsable exoplanet catalog.
#[derive(Parser)]
#[command(
    name = "exoatlas",
    version,
    about = "Enrich an exoplanet catalog with article descriptions and images, then browse it.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Database path (overrides `defaults.database_path`).
    #[arg(long, global = true, env = "EXOATLAS_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Read the catalog, enrich every record, and replace the database table.
    Import {
        /// Catalog CSV (overrides `defaults.catalog_path`).
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Concurrent lookups (overrides `defaults.concurrency`).
        #[arg(short = 'j', long)]
        concurrency: Option<u32>,

        /// Title qualifier for the first lookup (overrides `wiki.title_qualifier`).
        #[arg(long)]
        qualifier: Option<String>,

        /// Per-request timeout in seconds (overrides `wiki.timeout_secs`).
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// List stored planets, one page at a time.
    Browse {
        /// Substring to match against planet and host names.
        #[arg(short, long)]
        search: Option<String>,

        /// Only planets discovered with this method (e.g. "Transit").
        #[arg(short, long, conflicts_with_all = ["search", "photos"])]
        method: Option<String>,

        /// 1-based page number.
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Rows per page (overrides `defaults.per_page`).
        #[arg(long)]
        per_page: Option<u32>,

        /// Only planets with a real image.
        #[arg(long)]
        photos: bool,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show every stored field of one planet.
    Show {
        /// Exact planet name, e.g. "Kepler-7 b".
        name: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// List the columns of the stored table.
    Columns,

    /// List recent imports.
    Runs {
        /// Maximum number of runs to show.
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "exoatlas=info",
        1 => "exoatlas=debug",
        _ => "exoatlas=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db;
    match cli.command {
        Command::Import {
            catalog,
            concurrency,
            qualifier,
            timeout,
        } => {
            let overrides = ImportOverrides {
                catalog,
                database: db,
                concurrency,
                qualifier,
                timeout,
            };
            cmd_import(overrides).await
        }
        Command::Browse {
            search,
            method,
            page,
            per_page,
            photos,
            json,
        } => {
            let args = BrowseArgs {
                search,
                method,
                page,
                per_page,
                photos,
                json,
            };
            cmd_browse(db, args).await
        }
        Command::Show { name, json } => cmd_show(db, &name, json).await,
        Command::Columns => cmd_columns(db).await,
        Command::Runs { limit } => cmd_runs(db, limit).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default)]
struct ImportOverrides {
    catalog: Option<PathBuf>,
    database: Option<PathBuf>,
    concurrency: Option<u32>,
    qualifier: Option<String>,
    timeout: Option<u64>,
}

impl ImportOverrides {
    fn apply(self, config: &AppConfig) -> ImportConfig {
        let mut import = ImportConfig::from(config);
        if let Some(catalog) = self.catalog {
            import.catalog_path = catalog;
        }
        if let Some(database) = self.database {
            import.database_path = database;
        }
        if let Some(concurrency) = self.concurrency {
            import.enrich.concurrency = concurrency;
        }
        if let Some(qualifier) = self.qualifier {
            import.enrich.title_qualifier = qualifier;
        }
        if self.timeout.is_some() {
            import.enrich.timeout_secs = self.timeout;
        }
        import
    }
}

async fn cmd_import(overrides: ImportOverrides) -> Result<()> {
    let config = load_config()?;
    let import = overrides.apply(&config);

    info!(
        catalog = %import.catalog_path.display(),
        db = %import.database_path.display(),
        concurrency = import.enrich.concurrency,
        "importing catalog"
    );

    let reporter = CliProgress::new();
    let result = import_catalog(&import, &reporter).await;
    reporter.finish();
    let summary = result?;

    println!();
    println!("  Catalog imported!");
    println!("  Run:        {}", summary.run_id);
    println!("  Records:    {}", summary.catalog_records);
    println!("  Enriched:   {}", summary.stats.enriched);
    println!("  Unresolved: {}", summary.stats.unresolved);
    println!("  Rejected:   {}", summary.stats.rejected);
    println!("  Failed:     {}", summary.stats.failed);
    println!("  Stored:     {}", summary.stored);
    println!("  Database:   {}", import.database_path.display());
    println!("  Time:       {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl EnrichmentProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn record_done(&self, name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Enriching [{current}/{total}] {name}"));
    }
}

// ---------------------------------------------------------------------------
// Browsing
// ---------------------------------------------------------------------------

struct BrowseArgs {
    search: Option<String>,
    method: Option<String>,
    page: u32,
    per_page: Option<u32>,
    photos: bool,
    json: bool,
}

/// Resolve the database path from the flag or the config file.
fn database_path(db: Option<PathBuf>) -> Result<PathBuf> {
    match db {
        Some(path) => Ok(path),
        None => Ok(PathBuf::from(load_config()?.defaults.database_path)),
    }
}

async fn open_store(db: Option<PathBuf>) -> Result<Storage> {
    let path = database_path(db)?;
    Ok(Storage::open_readonly(&path).await?)
}

async fn cmd_browse(db: Option<PathBuf>, args: BrowseArgs) -> Result<()> {
    if args.page == 0 {
        return Err(eyre!("pages are numbered from 1"));
    }
    let per_page = match args.per_page {
        Some(n) => n,
        None => load_config()?.defaults.per_page,
    };
    let storage = open_store(db).await?;

    let (planets, total) = match args.method.as_deref() {
        Some(method) => {
            let all = storage.planets_by_discovery_method(method).await?;
            let total = all.len() as u64;
            let skip = (args.page as usize - 1).saturating_mul(per_page as usize);
            let page = all.into_iter().skip(skip).take(per_page as usize).collect();
            (page, total)
        }
        None => {
            let mut query = BrowseQuery::page(args.search, args.page, per_page);
            query.photos_only = args.photos;
            let total = storage.count_planets(&query).await?;
            (storage.list_planets(&query).await?, total)
        }
    };

    if args.json {
        let rows: Vec<_> = planets.iter().map(planet_json).collect();
        let out = serde_json::json!({
            "page": args.page,
            "per_page": per_page,
            "total": total,
            "planets": rows,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if planets.is_empty() {
        println!("No planets found.");
        return Ok(());
    }

    println!("{:<28} {:<22} {:>5}  {:<18} IMAGE", "NAME", "HOST", "YEAR", "METHOD");
    for planet in &planets {
        println!(
            "{:<28} {:<22} {:>5}  {:<18} {}",
            truncate(&planet.name, 28),
            truncate(planet.attribute("hostname").unwrap_or("-"), 22),
            planet.attribute("disc_year").unwrap_or("-"),
            truncate(planet.attribute("discoverymethod").unwrap_or("-"), 18),
            image_label(planet.image_url.as_deref()),
        );
    }
    let pages = total.div_ceil(u64::from(per_page.max(1)));
    println!();
    println!("  Page {} of {pages} ({total} planets)", args.page);

    Ok(())
}

async fn cmd_show(db: Option<PathBuf>, name: &str, json: bool) -> Result<()> {
    let storage = open_store(db).await?;
    let planet = storage
        .get_planet(name)
        .await?
        .ok_or_else(|| eyre!("no planet named '{name}' in the database"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&planet_json(&planet))?);
        return Ok(());
    }

    println!();
    println!("  {}", planet.name);
    println!();
    for (column, value) in &planet.attributes {
        println!("  {column:<18} {value}");
    }
    println!();
    if let Some(description) = &planet.description {
        println!("  {description}");
        println!();
    }
    if let Some(image) = &planet.image_url {
        println!("  Image: {image} ({})", image_label(Some(image)));
        println!();
    }

    Ok(())
}

async fn cmd_columns(db: Option<PathBuf>) -> Result<()> {
    let storage = open_store(db).await?;
    let columns = storage.table_columns().await?;
    if columns.is_empty() {
        println!("No catalog imported yet.");
        return Ok(());
    }

    println!("Columns in the exoplanets table:");
    for column in columns {
        println!("{column}");
    }
    Ok(())
}

async fn cmd_runs(db: Option<PathBuf>, limit: u32) -> Result<()> {
    let storage = open_store(db).await?;
    let runs = storage.list_import_runs(limit).await?;
    if runs.is_empty() {
        println!("No imports recorded.");
        return Ok(());
    }

    for run in runs {
        let status = run
            .stats
            .as_ref()
            .and_then(|s| s.get("status"))
            .and_then(|s| s.as_str())
            .unwrap_or("running");
        let stored = run
            .stats
            .as_ref()
            .and_then(|s| s.get("stored"))
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{}  {:<10} stored={:<6} {}  {}",
            run.id, status, stored, run.started_at, run.source
        );
    }
    Ok(())
}

fn planet_json(planet: &StoredPlanet) -> serde_json::Value {
    let attributes: serde_json::Map<String, serde_json::Value> = planet
        .attributes
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
        .collect();
    serde_json::json!({
        "name": planet.name,
        "description": planet.description,
        "image_url": planet.image_url,
        "attributes": attributes,
    })
}

/// Short image status for table output.
fn image_label(image_url: Option<&str>) -> &'static str {
    match image_url {
        Some(uri) if is_placeholder_image(uri) => "placeholder",
        Some(_) => "photo",
        None => "-",
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_import_overrides() {
        let cli = Cli::try_parse_from([
            "exoatlas",
            "--db",
            "/tmp/x.db",
            "import",
            "--catalog",
            "c.csv",
            "-j",
            "4",
            "--timeout",
            "15",
        ])
        .unwrap();

        let Command::Import {
            catalog,
            concurrency,
            qualifier,
            timeout,
        } = cli.command
        else {
            panic!("expected import");
        };
        let import = ImportOverrides {
            catalog,
            database: cli.db,
            concurrency,
            qualifier,
            timeout,
        }
        .apply(&AppConfig::default());

        assert_eq!(import.catalog_path, PathBuf::from("c.csv"));
        assert_eq!(import.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(import.enrich.concurrency, 4);
        assert_eq!(import.enrich.timeout_secs, Some(15));
        assert_eq!(import.enrich.title_qualifier, "exoplanet");
    }

    #[test]
    fn defaults_come_from_config() {
        let import = ImportOverrides::default().apply(&AppConfig::default());
        assert_eq!(import.enrich.concurrency, 10);
        assert_eq!(import.enrich.timeout_secs, None);
        assert!(import.catalog_path.ends_with("nasa_exoplanet_data.csv"));
    }

    #[test]
    fn browse_method_conflicts_with_search() {
        let result = Cli::try_parse_from([
            "exoatlas", "browse", "--method", "Transit", "--search", "kepler",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::try_parse_from(["exoatlas", "-vv", "columns"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn image_label_tells_placeholders_apart() {
        assert_eq!(image_label(None), "-");
        assert_eq!(
            image_label(Some("https://upload.wikimedia.org/a/Kepler-7b.jpg")),
            "photo"
        );
        assert_eq!(
            image_label(Some("https://via.placeholder.com/300?text=Kepler-7+b+Image+Not+Found")),
            "placeholder"
        );
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("Kepler-7 b", 20), "Kepler-7 b");
        assert_eq!(truncate("OGLE-2005-BLG-390L b", 10), "OGLE-2005…");
    }

    #[test]
    fn planet_json_shape() {
        let planet = StoredPlanet {
            name: "Kepler-7 b".into(),
            description: Some("An exoplanet.".into()),
            image_url: None,
            attributes: vec![("hostname".into(), "Kepler-7".into())],
        };
        let value = planet_json(&planet);
        assert_eq!(value["name"], "Kepler-7 b");
        assert_eq!(value["attributes"]["hostname"], "Kepler-7");
        assert!(value["image_url"].is_null());
    }
}
