//! SQL migration definitions for the ExoAtlas database.
//!
//! Migrations are applied in order on database open. They cover the
//! bookkeeping tables only: the `exoplanets` table itself is dropped and
//! recreated on every import, with columns taken from the catalog.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: schema_migrations, import_runs",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per catalog import
CREATE TABLE IF NOT EXISTS import_runs (
    id          TEXT PRIMARY KEY,
    source      TEXT NOT NULL,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    stats_json  TEXT
);

CREATE INDEX IF NOT EXISTS idx_import_runs_started ON import_runs(started_at);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
