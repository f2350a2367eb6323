//! ExoAtlas CLI: enrich an exoplanet catalog and browse the result.
//!
//! Imports a NASA Exoplanet Archive CSV, attaches article descriptions and
//! images from a page-summary service, and stores the enriched table in a
//! local libSQL database.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
