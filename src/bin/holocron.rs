//! holocron: load a REST catalog into SQLite
//!
//! Usage:
//!   # Fetch swapi.dev and rebuild ./holocron.sqlite
//!   holocron
//!
//!   # Different catalog and database
//!   holocron --base-url http://localhost:8000/api/ --database /tmp/swapi.sqlite
//!
//!   # Shape only, print rows as NDJSON
//!   holocron --dry-run
//!
//!   # Keep the fetched pages, then replay them later without the network
//!   holocron --snapshot-out swapi.json
//!   holocron --snapshot-in swapi.json
//!
//! Settings also come from HOLOCRON_BASE_URL, HOLOCRON_DATABASE and
//! HOLOCRON_TIMEOUT_SECS; flags win over the environment.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::Result;
use clap::Parser;
use holocron::catalog::{fetch_all, CatalogSnapshot, HttpCatalog};
use holocron::pipeline::{run_snapshot, shape_catalog};
use holocron::{CatalogPlan, RowWriter, Settings};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "holocron")]
#[command(about = "Load a REST catalog into a normalized SQLite schema", long_about = None)]
struct Args {
    /// SQLite database to rebuild
    #[arg(long, short = 'd', value_name = "FILE")]
    database: Option<PathBuf>,

    /// Catalog root URL (collections live at <base-url><resource>/)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Shape the catalog and print rows to stdout instead of loading
    #[arg(long)]
    dry_run: bool,

    /// Read the catalog from a saved snapshot instead of over HTTP
    #[arg(long, value_name = "FILE", conflicts_with = "base_url")]
    snapshot_in: Option<PathBuf>,

    /// Save the fetched catalog to a snapshot file
    #[arg(long, value_name = "FILE")]
    snapshot_out: Option<PathBuf>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut settings = Settings::load()?;
    if let Some(base_url) = &args.base_url {
        settings = settings.with_base_url(base_url);
    }
    if let Some(database) = args.database {
        settings = settings.with_database(database);
    }
    info!(?settings, "starting");

    let plan = CatalogPlan::swapi();

    let snapshot = match &args.snapshot_in {
        Some(path) => CatalogSnapshot::load(path)?,
        None => {
            let catalog = HttpCatalog::new(&settings.base_url, settings.timeout())?;
            fetch_all(&catalog, &plan.resources())?
        }
    };

    if let Some(path) = &args.snapshot_out {
        snapshot.save(path)?;
        info!(path = %path.display(), "snapshot saved");
    }

    if args.dry_run {
        let shaped = shape_catalog(&plan, &snapshot)?;
        let mut writer = RowWriter::new(std::io::stdout().lock());
        writer.write_catalog(&shaped)?;
        writer.flush()?;
        return Ok(());
    }

    run_snapshot(&plan, &snapshot, &settings.database)?;
    Ok(())
}
