// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use super::{Column, Comparison, Pagination, Predicate, PredicateValue, QueryParams, SortOrder};
use crate::errors::QueryError;
use crate::models::Trip;
use std::collections::HashSet;

pub const METERS_PER_KILOMETER: f64 = 1000.0;
pub const SECONDS_PER_MINUTE: f64 = 60.0;
const WHOLE_SECOND_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripColumn {
    DepartureStation,
    ReturnStation,
    Distance,
    Duration,
}

impl Column for TripColumn {
    type Row = Trip;

    fn value_of(self, row: &Trip) -> Option<PredicateValue> {
        Some(match self {
            TripColumn::DepartureStation => PredicateValue::Integer(row.departure_station),
            TripColumn::ReturnStation => PredicateValue::Integer(row.return_station),
            TripColumn::Distance => PredicateValue::Real(row.distance),
            TripColumn::Duration => PredicateValue::Integer(row.duration),
        })
    }
}

/// A validated `GET /trips` request.
#[derive(Debug, Clone, PartialEq)]
pub struct TripQuery {
    pub predicates: Vec<Predicate<TripColumn>>,
    pub pagination: Pagination,
    pub sort: SortOrder,
}

impl TripQuery {
    /// `distance` arrives in kilometers and `duration` in minutes; both are
    /// converted to the stored units before validation.
    pub fn from_params(
        params: &QueryParams,
        trip_count: i64,
        station_ids: &HashSet<i32>,
    ) -> Result<Self, QueryError> {
        let pagination = Pagination::from_params(params, trip_count)?;
        let mut predicates = Vec::new();

        if let Some(raw) = params.first("distance") {
            let meters = parse_number("distance", raw)? * METERS_PER_KILOMETER;
            if meters < 0.0 {
                return Err(QueryError::bad_parameter("distance", meters, ">= 0"));
            }
            predicates.push(equals(
                TripColumn::Distance,
                PredicateValue::Real(meters as f32),
            ));
        }

        if let Some(raw) = params.first("duration") {
            let seconds = parse_number("duration", raw)? * SECONDS_PER_MINUTE;
            if seconds < 0.0 {
                return Err(QueryError::bad_parameter("duration", seconds, ">= 0"));
            }
            // stored durations are whole seconds, so 0.01 min could never match
            let whole = seconds.round();
            if (seconds - whole).abs() > WHOLE_SECOND_TOLERANCE || whole > f64::from(i32::MAX) {
                return Err(QueryError::bad_parameter(
                    "duration",
                    seconds,
                    "a whole number of seconds",
                ));
            }
            predicates.push(equals(
                TripColumn::Duration,
                PredicateValue::Integer(whole as i32),
            ));
        }

        if let Some(raw) = params.first("departure") {
            let id = existing_station("departure", raw, station_ids)?;
            predicates.push(equals(
                TripColumn::DepartureStation,
                PredicateValue::Integer(id),
            ));
        }

        if let Some(raw) = params.first("return") {
            let id = existing_station("return", raw, station_ids)?;
            predicates.push(equals(TripColumn::ReturnStation, PredicateValue::Integer(id)));
        }

        let sort = SortOrder::from_params(params)?;

        Ok(TripQuery {
            predicates,
            pagination,
            sort,
        })
    }

    pub fn matches(&self, trip: &Trip) -> bool {
        self.predicates.iter().all(|p| p.matches(trip))
    }
}

fn equals(column: TripColumn, value: PredicateValue) -> Predicate<TripColumn> {
    Predicate::new(column, Comparison::Equals, value)
}

fn parse_number(name: &'static str, raw: &str) -> Result<f64, QueryError> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(QueryError::bad_parameter(name, raw, ">= 0")),
    }
}

fn existing_station(
    name: &'static str,
    raw: &str,
    station_ids: &HashSet<i32>,
) -> Result<i32, QueryError> {
    match raw.trim().parse::<i32>() {
        Ok(id) if station_ids.contains(&id) => Ok(id),
        _ => Err(QueryError::bad_parameter(
            name,
            raw,
            "that the referenced station exists",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn station_ids() -> HashSet<i32> {
        [501, 502, 503].into_iter().collect()
    }

    fn query(raw: &str) -> Result<TripQuery, QueryError> {
        TripQuery::from_params(&QueryParams::parse(raw), 1000, &station_ids())
    }

    fn trip(distance: f32, duration: i32) -> Trip {
        let departure = NaiveDate::from_ymd_opt(2021, 5, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        Trip {
            id: 1,
            departure_time: departure,
            return_time: departure + chrono::Duration::seconds(i64::from(duration)),
            departure_station: 501,
            return_station: 502,
            distance,
            duration,
        }
    }

    #[test]
    fn distance_is_converted_to_meters() {
        let q = query("page=1&perPage=10&distance=4.604").unwrap();
        assert_eq!(
            q.predicates,
            vec![equals(TripColumn::Distance, PredicateValue::Real(4604.0))]
        );
        assert!(q.matches(&trip(4604.0, 600)));
        assert!(!q.matches(&trip(4605.0, 600)));
    }

    #[test]
    fn duration_is_converted_to_seconds() {
        let q = query("page=1&perPage=10&duration=18.9").unwrap();
        assert_eq!(
            q.predicates,
            vec![equals(TripColumn::Duration, PredicateValue::Integer(1134))]
        );
        assert!(q.matches(&trip(1000.0, 1134)));
    }

    #[test]
    fn fractional_seconds_are_rejected() {
        assert_eq!(
            query("page=1&perPage=10&duration=0.01").unwrap_err().to_string(),
            "The parameter duration has value 0.6. Expected a whole number of seconds"
        );

        let q = query("page=1&perPage=10&duration=0.5").unwrap();
        assert_eq!(
            q.predicates,
            vec![equals(TripColumn::Duration, PredicateValue::Integer(30))]
        );
        assert!(!q.matches(&trip(1000.0, 1)));
    }

    #[test]
    fn negative_values_report_converted_units() {
        assert_eq!(
            query("page=1&perPage=10&distance=-1").unwrap_err().to_string(),
            "The parameter distance has value -1000. Expected >= 0"
        );
        assert_eq!(
            query("page=1&perPage=10&duration=-1").unwrap_err().to_string(),
            "The parameter duration has value -60. Expected >= 0"
        );
    }

    #[test]
    fn non_numeric_distance_is_rejected() {
        assert_eq!(
            query("page=1&perPage=10&distance=far").unwrap_err().to_string(),
            "The parameter distance has value far. Expected >= 0"
        );
    }

    #[test]
    fn referenced_stations_must_exist() {
        assert_eq!(
            query("page=1&perPage=10&departure=99999").unwrap_err().to_string(),
            "The parameter departure has value 99999. Expected that the referenced station exists"
        );
        assert_eq!(
            query("page=1&perPage=10&return=99999").unwrap_err().to_string(),
            "The parameter return has value 99999. Expected that the referenced station exists"
        );

        let q = query("page=1&perPage=10&departure=501&return=502").unwrap();
        assert!(q.matches(&trip(1000.0, 60)));

        let q = query("page=1&perPage=10&departure=502").unwrap();
        assert!(!q.matches(&trip(1000.0, 60)));
    }

    #[test]
    fn per_page_is_capped_by_trip_count() {
        assert_eq!(
            query("page=1&perPage=1001").unwrap_err().to_string(),
            "The parameter perPage has value 1001. Expected 1 <= perPage <= 1000"
        );
    }
}
