// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use super::{CounterpartCount, Direction, Listing, Repository};
use crate::errors::RepositoryError;
use crate::models::{Station, Trip, TripWithStations};
use crate::query::{SortOrder, StationQuery, TripQuery};
use async_trait::async_trait;
use chrono::Datelike;
use std::collections::{HashMap, HashSet};

/// Keeps every row in memory and evaluates predicates directly on them.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    stations: Vec<Station>,
    trips: Vec<Trip>,
}

impl MemoryRepository {
    pub fn new(mut stations: Vec<Station>, mut trips: Vec<Trip>) -> Self {
        stations.sort_by_key(|s| s.id);
        trips.sort_by_key(|t| t.id);
        MemoryRepository { stations, trips }
    }

    fn in_month(trip: &Trip, month: Option<u32>) -> bool {
        month.is_none_or(|m| trip.departure_time.month() == m)
    }

    fn ordered<T>(mut rows: Vec<T>, sort: SortOrder) -> Vec<T> {
        if sort == SortOrder::Desc {
            rows.reverse();
        }
        rows
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn station_count(&self) -> Result<i64, RepositoryError> {
        Ok(self.stations.len() as i64)
    }

    async fn trip_count(&self) -> Result<i64, RepositoryError> {
        Ok(self.trips.len() as i64)
    }

    async fn station_ids(&self) -> Result<HashSet<i32>, RepositoryError> {
        Ok(self.stations.iter().map(|s| s.id).collect())
    }

    async fn station(&self, id: i32) -> Result<Option<Station>, RepositoryError> {
        Ok(self.stations.iter().find(|s| s.id == id).cloned())
    }

    async fn stations(&self, query: &StationQuery) -> Result<Listing<Station>, RepositoryError> {
        let matching = self
            .stations
            .iter()
            .filter(|s| query.matches(s))
            .cloned()
            .collect::<Vec<_>>();
        let total = matching.len() as i64;

        Ok(Listing {
            items: query.pagination.slice(Self::ordered(matching, query.sort)),
            total,
        })
    }

    async fn trips(&self, query: &TripQuery) -> Result<Listing<TripWithStations>, RepositoryError> {
        let matching = self
            .trips
            .iter()
            .filter(|t| query.matches(t))
            .cloned()
            .collect::<Vec<_>>();
        let total = matching.len() as i64;

        let stations_by_id: HashMap<i32, &Station> =
            self.stations.iter().map(|s| (s.id, s)).collect();

        let items = query
            .pagination
            .slice(Self::ordered(matching, query.sort))
            .into_iter()
            .filter_map(|trip| {
                let departure = stations_by_id.get(&trip.departure_station)?;
                let arrival = stations_by_id.get(&trip.return_station)?;
                Some(TripWithStations::new(
                    trip,
                    (*departure).clone(),
                    (*arrival).clone(),
                ))
            })
            .collect();

        Ok(Listing { items, total })
    }

    async fn trips_arriving_at(
        &self,
        station_id: i32,
        month: Option<u32>,
    ) -> Result<Vec<Trip>, RepositoryError> {
        Ok(self
            .trips
            .iter()
            .filter(|t| t.return_station == station_id && Self::in_month(t, month))
            .cloned()
            .collect())
    }

    async fn trips_departing_from(
        &self,
        station_id: i32,
        month: Option<u32>,
    ) -> Result<Vec<Trip>, RepositoryError> {
        Ok(self
            .trips
            .iter()
            .filter(|t| t.departure_station == station_id && Self::in_month(t, month))
            .cloned()
            .collect())
    }

    async fn top_counterparts(
        &self,
        station_id: i32,
        direction: Direction,
        month: Option<u32>,
        limit: i64,
    ) -> Result<Vec<CounterpartCount>, RepositoryError> {
        let mut counts: HashMap<i32, i64> = HashMap::new();

        for trip in self.trips.iter().filter(|t| Self::in_month(t, month)) {
            let counterpart = match direction {
                Direction::Inbound if trip.return_station == station_id => trip.departure_station,
                Direction::Outbound if trip.departure_station == station_id => {
                    trip.return_station
                }
                _ => continue,
            };
            *counts.entry(counterpart).or_insert(0) += 1;
        }

        let mut ranked = counts
            .into_iter()
            .map(|(station, total)| CounterpartCount { station, total })
            .collect::<Vec<_>>();
        ranked.sort_by(|a, b| b.total.cmp(&a.total).then(a.station.cmp(&b.station)));
        ranked.truncate(limit.max(0) as usize);

        Ok(ranked)
    }
}
