// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use super::{CounterpartCount, Direction, Listing, Repository};
use crate::errors::RepositoryError;
use crate::models::{Station, Trip, TripWithStations};
use crate::postgres_tools::CitybikePostgresPool;
use crate::query::{
    Comparison, Predicate, PredicateValue, SortOrder, StationColumn, StationQuery, TripColumn,
    TripQuery, like_pattern,
};
use crate::schema::{stations, trips};
use async_trait::async_trait;
use diesel::dsl::count_star;
use diesel::pg::Pg;
use diesel::sql_types::BigInt;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

diesel::define_sql_function! {
    fn date_part(field: diesel::sql_types::Text, source: diesel::sql_types::Timestamp) -> diesel::sql_types::Double;
}

type StationsQuery<ST> = stations::BoxedQuery<'static, Pg, ST>;
type TripsQuery<ST> = trips::BoxedQuery<'static, Pg, ST>;

pub struct PostgresRepository {
    pool: Arc<CitybikePostgresPool>,
}

impl PostgresRepository {
    pub fn new(pool: Arc<CitybikePostgresPool>) -> Self {
        PostgresRepository { pool }
    }
}

fn unsupported<C: std::fmt::Debug>(predicate: &Predicate<C>) -> RepositoryError {
    RepositoryError::UnsupportedPredicate(format!("{:?}", predicate))
}

macro_rules! text_filter {
    ($query:expr, $column:expr, $comparison:expr, $text:expr) => {
        match $comparison {
            Comparison::Equals => $query.filter($column.eq($text.clone())),
            Comparison::Contains => $query.filter($column.like(like_pattern($text))),
        }
    };
}

fn filter_stations<ST: 'static>(
    mut query: StationsQuery<ST>,
    predicates: &[Predicate<StationColumn>],
) -> Result<StationsQuery<ST>, RepositoryError> {
    for predicate in predicates {
        query = match (predicate.column, &predicate.value) {
            (StationColumn::NameFi, PredicateValue::Text(text)) => {
                text_filter!(query, stations::name_fi, predicate.comparison, text)
            }
            (StationColumn::NameSe, PredicateValue::Text(text)) => {
                text_filter!(query, stations::name_se, predicate.comparison, text)
            }
            (StationColumn::NameEn, PredicateValue::Text(text)) => {
                text_filter!(query, stations::name_en, predicate.comparison, text)
            }
            (StationColumn::AddressFi, PredicateValue::Text(text)) => {
                text_filter!(query, stations::address_fi, predicate.comparison, text)
            }
            (StationColumn::AddressSe, PredicateValue::Text(text)) => {
                text_filter!(query, stations::address_se, predicate.comparison, text)
            }
            (StationColumn::CityFi, PredicateValue::Text(text)) => {
                text_filter!(query, stations::city_fi, predicate.comparison, text)
            }
            (StationColumn::CitySe, PredicateValue::Text(text)) => {
                text_filter!(query, stations::city_se, predicate.comparison, text)
            }
            (StationColumn::Operator, PredicateValue::Text(text)) => {
                text_filter!(query, stations::operator, predicate.comparison, text)
            }
            (StationColumn::Capacity, PredicateValue::Integer(capacity))
                if predicate.comparison == Comparison::Equals =>
            {
                query.filter(stations::capacity.eq(*capacity))
            }
            _ => return Err(unsupported(predicate)),
        };
    }

    Ok(query)
}

fn filter_trips<ST: 'static>(
    mut query: TripsQuery<ST>,
    predicates: &[Predicate<TripColumn>],
) -> Result<TripsQuery<ST>, RepositoryError> {
    for predicate in predicates {
        if predicate.comparison != Comparison::Equals {
            return Err(unsupported(predicate));
        }

        query = match (predicate.column, &predicate.value) {
            (TripColumn::DepartureStation, PredicateValue::Integer(id)) => {
                query.filter(trips::departure_station.eq(*id))
            }
            (TripColumn::ReturnStation, PredicateValue::Integer(id)) => {
                query.filter(trips::return_station.eq(*id))
            }
            (TripColumn::Distance, PredicateValue::Real(meters)) => {
                query.filter(trips::distance.eq(*meters))
            }
            (TripColumn::Duration, PredicateValue::Integer(seconds)) => {
                query.filter(trips::duration.eq(*seconds))
            }
            _ => return Err(unsupported(predicate)),
        };
    }

    Ok(query)
}

fn in_month<ST: 'static>(query: TripsQuery<ST>, month: Option<u32>) -> TripsQuery<ST> {
    match month {
        Some(month) => {
            query.filter(date_part("month", trips::departure_time).eq(f64::from(month)))
        }
        None => query,
    }
}

// `(counterpart, trips)` rows, most trips first, ties on the lower station id.
macro_rules! counterpart_query {
    ($own:expr, $counterpart:expr, $station_id:expr, $month:expr, $limit:expr) => {
        in_month(trips::table.filter($own.eq($station_id)).into_boxed(), $month)
            .group_by($counterpart)
            .select(($counterpart, count_star()))
            .order_by((count_star().desc(), $counterpart.asc()))
            .limit($limit)
    };
}

fn station_count_query(
    predicates: &[Predicate<StationColumn>],
) -> Result<StationsQuery<BigInt>, RepositoryError> {
    filter_stations(stations::table.select(count_star()).into_boxed(), predicates)
}

fn trip_count_query(
    predicates: &[Predicate<TripColumn>],
) -> Result<TripsQuery<BigInt>, RepositoryError> {
    filter_trips(trips::table.select(count_star()).into_boxed(), predicates)
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn station_count(&self) -> Result<i64, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let count = stations::table.count().get_result(&mut conn).await?;
        Ok(count)
    }

    async fn trip_count(&self) -> Result<i64, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let count = trips::table.count().get_result(&mut conn).await?;
        Ok(count)
    }

    async fn station_ids(&self) -> Result<HashSet<i32>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let ids: Vec<i32> = stations::table
            .select(stations::id)
            .load(&mut conn)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn station(&self, id: i32) -> Result<Option<Station>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let station = stations::table
            .filter(stations::id.eq(id))
            .select(Station::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        Ok(station)
    }

    async fn stations(&self, query: &StationQuery) -> Result<Listing<Station>, RepositoryError> {
        let mut conn = self.pool.get().await?;

        let total: i64 = station_count_query(&query.predicates)?
            .get_result(&mut conn)
            .await?;

        let page = filter_stations(
            stations::table.select(Station::as_select()).into_boxed(),
            &query.predicates,
        )?;
        let page = match query.sort {
            SortOrder::Asc => page.order(stations::id.asc()),
            SortOrder::Desc => page.order(stations::id.desc()),
        };

        let items = page
            .offset(query.pagination.offset())
            .limit(query.pagination.limit())
            .load::<Station>(&mut conn)
            .await?;

        Ok(Listing { items, total })
    }

    async fn trips(&self, query: &TripQuery) -> Result<Listing<TripWithStations>, RepositoryError> {
        let mut conn = self.pool.get().await?;

        let total: i64 = trip_count_query(&query.predicates)?
            .get_result(&mut conn)
            .await?;

        let page = filter_trips(
            trips::table.select(Trip::as_select()).into_boxed(),
            &query.predicates,
        )?;
        let page = match query.sort {
            SortOrder::Asc => page.order(trips::id.asc()),
            SortOrder::Desc => page.order(trips::id.desc()),
        };

        let rows = page
            .offset(query.pagination.offset())
            .limit(query.pagination.limit())
            .load::<Trip>(&mut conn)
            .await?;

        let referenced: HashSet<i32> = rows
            .iter()
            .flat_map(|t| [t.departure_station, t.return_station])
            .collect();

        let stations_by_id: HashMap<i32, Station> = stations::table
            .filter(stations::id.eq_any(referenced.into_iter().collect::<Vec<i32>>()))
            .select(Station::as_select())
            .load::<Station>(&mut conn)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let items = rows
            .into_iter()
            .filter_map(|trip| {
                let departure = stations_by_id.get(&trip.departure_station)?.clone();
                let arrival = stations_by_id.get(&trip.return_station)?.clone();
                Some(TripWithStations::new(trip, departure, arrival))
            })
            .collect();

        Ok(Listing { items, total })
    }

    async fn trips_arriving_at(
        &self,
        station_id: i32,
        month: Option<u32>,
    ) -> Result<Vec<Trip>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let rows = in_month(
            trips::table
                .filter(trips::return_station.eq(station_id))
                .select(Trip::as_select())
                .into_boxed(),
            month,
        )
        .order(trips::id.asc())
        .load::<Trip>(&mut conn)
        .await?;
        Ok(rows)
    }

    async fn trips_departing_from(
        &self,
        station_id: i32,
        month: Option<u32>,
    ) -> Result<Vec<Trip>, RepositoryError> {
        let mut conn = self.pool.get().await?;
        let rows = in_month(
            trips::table
                .filter(trips::departure_station.eq(station_id))
                .select(Trip::as_select())
                .into_boxed(),
            month,
        )
        .order(trips::id.asc())
        .load::<Trip>(&mut conn)
        .await?;
        Ok(rows)
    }

    async fn top_counterparts(
        &self,
        station_id: i32,
        direction: Direction,
        month: Option<u32>,
        limit: i64,
    ) -> Result<Vec<CounterpartCount>, RepositoryError> {
        let mut conn = self.pool.get().await?;

        let rows: Vec<(i32, i64)> = match direction {
            Direction::Inbound => {
                counterpart_query!(
                    trips::return_station,
                    trips::departure_station,
                    station_id,
                    month,
                    limit
                )
                .load(&mut conn)
                .await?
            }
            Direction::Outbound => {
                counterpart_query!(
                    trips::departure_station,
                    trips::return_station,
                    station_id,
                    month,
                    limit
                )
                .load(&mut conn)
                .await?
            }
        };

        Ok(rows
            .into_iter()
            .map(|(station, total)| CounterpartCount { station, total })
            .collect())
    }
}
