// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

//! Data access for stations and trips.
//!
//! Handlers only see [`Repository`]; the server injects a
//! [`PostgresRepository`] and tests use a [`MemoryRepository`].

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

use crate::errors::RepositoryError;
use crate::models::{Station, Trip, TripWithStations};
use crate::query::{StationQuery, TripQuery};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;

/// Rows of the requested page plus the number of rows matching the filters.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Which end of a trip belongs to the station being examined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Trips returned to the station; counterparts are their departure stations.
    Inbound,
    /// Trips leaving the station; counterparts are their return stations.
    Outbound,
}

/// A station at the other end of some trips, and how many.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterpartCount {
    pub station: i32,
    pub total: i64,
}

#[async_trait]
pub trait Repository: Send + Sync {
    async fn station_count(&self) -> Result<i64, RepositoryError>;

    async fn trip_count(&self) -> Result<i64, RepositoryError>;

    async fn station_ids(&self) -> Result<HashSet<i32>, RepositoryError>;

    async fn station(&self, id: i32) -> Result<Option<Station>, RepositoryError>;

    async fn stations(&self, query: &StationQuery) -> Result<Listing<Station>, RepositoryError>;

    async fn trips(&self, query: &TripQuery) -> Result<Listing<TripWithStations>, RepositoryError>;

    /// Trips whose return station is `station_id`, optionally only those departing in `month`.
    async fn trips_arriving_at(
        &self,
        station_id: i32,
        month: Option<u32>,
    ) -> Result<Vec<Trip>, RepositoryError>;

    /// Trips whose departure station is `station_id`, optionally only those departing in `month`.
    async fn trips_departing_from(
        &self,
        station_id: i32,
        month: Option<u32>,
    ) -> Result<Vec<Trip>, RepositoryError>;

    /// Counterpart stations ordered by trip count descending, then station id ascending.
    async fn top_counterparts(
        &self,
        station_id: i32,
        direction: Direction,
        month: Option<u32>,
        limit: i64,
    ) -> Result<Vec<CounterpartCount>, RepositoryError>;
}
