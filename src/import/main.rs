// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use citybike::config::Settings;
use citybike::ingest::{
    ImportSummary, IngestError, insert_into_postgres, read_journeys, read_stations,
};
use citybike::postgres_tools::{CitybikePostgresPool, make_async_pool};
use clap::Parser;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Load station and journey CSV dumps into PostgreSQL", long_about = None)]
struct Args {
    /// Station dump with the FID, ID, Nimi, Namn, ... header
    #[arg(long)]
    stations: PathBuf,
    /// Journey dumps, usually one file per month
    #[arg(long, num_args = 1..)]
    trips: Vec<PathBuf>,
    /// Delete all stations and trips before inserting
    #[arg(long, default_value_t = false)]
    truncate: bool,
}

fn open(path: &Path) -> Result<BufReader<File>, IngestError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| IngestError::Io {
            path: path.display().to_string(),
            source,
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = Settings::from_env()?;

    let stations = read_stations(open(&args.stations)?)?;
    let station_ids: HashSet<i32> = stations.iter().map(|s| s.id).collect();
    tracing::info!("Read {} stations from {}", stations.len(), args.stations.display());

    let mut summary = ImportSummary {
        stations: stations.len(),
        ..Default::default()
    };
    let mut trips = vec![];

    for path in &args.trips {
        let mut kept = read_journeys(open(path)?, &station_ids, &mut summary)?;
        tracing::info!("Kept {} journeys from {}", kept.len(), path.display());
        trips.append(&mut kept);
    }

    let conn_pool: CitybikePostgresPool = make_async_pool(&settings.database_url, 2)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    insert_into_postgres(Arc::new(conn_pool), &stations, &trips, args.truncate).await?;

    tracing::info!(
        stations = summary.stations,
        trips = summary.trips,
        too_short = summary.too_short,
        unknown_station = summary.unknown_station,
        malformed = summary.malformed,
        "Import finished, skipped {} journeys",
        summary.skipped()
    );

    Ok(())
}
