// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

//! Loading of the public station and journey CSV dumps.

use crate::errors::RepositoryError;
use crate::models::{NewTrip, Station};
use crate::postgres_tools::CitybikePostgresPool;
use crate::schema::{stations, trips};
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord};
use diesel_async::AsyncConnection;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::sync::Arc;
use thiserror::Error;

pub const CHUNK_SIZE: usize = 1000;
pub const MIN_DISTANCE_METERS: f64 = 10.0;
pub const MIN_DURATION_SECONDS: i64 = 10;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Could not read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Could not open {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Deserialize)]
pub struct StationRecord {
    #[serde(rename = "ID")]
    pub id: i32,
    #[serde(rename = "Nimi")]
    pub name_fi: String,
    #[serde(rename = "Namn")]
    pub name_se: String,
    #[serde(rename = "Name")]
    pub name_en: String,
    #[serde(rename = "Osoite")]
    pub address_fi: String,
    #[serde(rename = "Adress")]
    pub address_se: String,
    #[serde(rename = "Kaupunki")]
    pub city_fi: Option<String>,
    #[serde(rename = "Stad")]
    pub city_se: Option<String>,
    #[serde(rename = "Operaattor")]
    pub operator: Option<String>,
    #[serde(rename = "Kapasiteet")]
    pub capacity: Option<i32>,
    pub x: f32,
    pub y: f32,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<StationRecord> for Station {
    fn from(record: StationRecord) -> Self {
        Station {
            id: record.id,
            name_fi: record.name_fi,
            name_se: record.name_se,
            name_en: record.name_en,
            address_fi: record.address_fi,
            address_se: record.address_se,
            city_fi: non_blank(record.city_fi),
            city_se: non_blank(record.city_se),
            operator: non_blank(record.operator),
            capacity: record.capacity,
            x: record.x,
            y: record.y,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JourneyRecord {
    #[serde(rename = "Departure")]
    pub departure: NaiveDateTime,
    #[serde(rename = "Return")]
    pub arrival: NaiveDateTime,
    #[serde(rename = "Departure station id")]
    pub departure_station: i32,
    #[serde(rename = "Return station id")]
    pub return_station: i32,
    #[serde(rename = "Covered distance (m)")]
    pub distance: Option<f64>,
    #[serde(rename = "Duration (sec.)")]
    pub duration: Option<i64>,
}

/// Why a journey row did not make it into the trips table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    TooShort,
    UnknownStation,
    Malformed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub stations: usize,
    pub trips: usize,
    pub too_short: usize,
    pub unknown_station: usize,
    pub malformed: usize,
}

impl ImportSummary {
    pub fn skipped(&self) -> usize {
        self.too_short + self.unknown_station + self.malformed
    }

    fn record(&mut self, skip: Skip) {
        match skip {
            Skip::TooShort => self.too_short += 1,
            Skip::UnknownStation => self.unknown_station += 1,
            Skip::Malformed => self.malformed += 1,
        }
    }
}

impl JourneyRecord {
    /// Journeys under 10 m or 10 s, or touching a station we do not know, are dropped.
    pub fn into_trip(self, station_ids: &HashSet<i32>) -> Result<NewTrip, Skip> {
        let (Some(distance), Some(duration)) = (self.distance, self.duration) else {
            return Err(Skip::Malformed);
        };

        if distance < MIN_DISTANCE_METERS || duration < MIN_DURATION_SECONDS {
            return Err(Skip::TooShort);
        }

        if !station_ids.contains(&self.departure_station)
            || !station_ids.contains(&self.return_station)
        {
            return Err(Skip::UnknownStation);
        }

        let duration = i32::try_from(duration).map_err(|_| Skip::Malformed)?;

        Ok(NewTrip {
            departure_time: self.departure,
            return_time: self.arrival,
            departure_station: self.departure_station,
            return_station: self.return_station,
            distance: distance as f32,
            duration,
        })
    }
}

// The dumps start with a byte order mark, which would otherwise stick to the first header.
fn csv_reader<R: Read>(input: R) -> Result<csv::Reader<R>, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b',')
        .from_reader(input);

    let headers: StringRecord = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim())
        .collect();
    rdr.set_headers(headers);

    Ok(rdr)
}

pub fn read_stations<R: Read>(input: R) -> Result<Vec<Station>, IngestError> {
    let mut rdr = csv_reader(input)?;
    let mut result: Vec<Station> = vec![];

    for csv_row in rdr.deserialize() {
        let row: StationRecord = csv_row?;
        result.push(row.into());
    }

    Ok(result)
}

/// Parses journeys, keeping only those that pass [`JourneyRecord::into_trip`].
/// Rejected rows are tallied in `summary`.
pub fn read_journeys<R: Read>(
    input: R,
    station_ids: &HashSet<i32>,
    summary: &mut ImportSummary,
) -> Result<Vec<NewTrip>, IngestError> {
    let mut rdr = csv_reader(input)?;
    let mut result: Vec<NewTrip> = vec![];

    for csv_row in rdr.deserialize::<JourneyRecord>() {
        let trip = match csv_row {
            Ok(row) => row.into_trip(station_ids),
            Err(err) => {
                tracing::debug!("Unreadable journey row: {}", err);
                Err(Skip::Malformed)
            }
        };

        match trip {
            Ok(trip) => result.push(trip),
            Err(skip) => summary.record(skip),
        }
    }

    summary.trips += result.len();

    Ok(result)
}

/// Writes everything in one transaction. Stations that already exist are left alone.
pub async fn insert_into_postgres(
    arc_conn_pool: Arc<CitybikePostgresPool>,
    new_stations: &[Station],
    new_trips: &[NewTrip],
    truncate: bool,
) -> Result<(), RepositoryError> {
    let conn_pool = arc_conn_pool.as_ref();
    let mut conn = conn_pool.get().await?;

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        async move {
            if truncate {
                diesel::delete(trips::table).execute(conn).await?;
                diesel::delete(stations::table).execute(conn).await?;
                tracing::info!("Cleared existing stations and trips");
            }

            for chunk in new_stations.chunks(CHUNK_SIZE) {
                diesel::insert_into(stations::table)
                    .values(chunk)
                    .on_conflict_do_nothing()
                    .execute(conn)
                    .await?;
            }

            for (i, chunk) in new_trips.chunks(CHUNK_SIZE).enumerate() {
                diesel::insert_into(trips::table)
                    .values(chunk)
                    .execute(conn)
                    .await?;

                if i % 100 == 99 {
                    tracing::info!("Inserted {} trips", (i + 1) * CHUNK_SIZE);
                }
            }

            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    Ok(())
}
