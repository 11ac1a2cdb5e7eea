// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

//! Per-station trip statistics.
//!
//! Totals and averages come from the station's inbound and outbound trip
//! sets; the top counterpart lists are aggregated by the repository. With a
//! month given, every figure only counts trips that departed in that month.

use crate::errors::QueryError;
use crate::models::Trip;
use crate::repository::{CounterpartCount, Direction, Repository};
use serde::{Deserialize, Serialize};

pub const TOP_STATIONS: i64 = 5;

/// A station that trips ending here most often started from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopInbound {
    pub departure_station: i32,
    pub total: i64,
}

/// A station that trips starting here most often ended at.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopOutbound {
    pub return_station: i32,
    pub total: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StationStatistics {
    pub total_inbound: usize,
    pub total_outbound: usize,
    /// `None` when the station has no inbound trips in the period.
    pub average_distance_inbound: Option<f64>,
    pub average_distance_outbound: Option<f64>,
    pub top_inbound: Vec<TopInbound>,
    pub top_outbound: Vec<TopOutbound>,
}

/// Mean trip distance rounded to two decimals, or `None` for no trips.
pub fn average_distance(trips: &[Trip]) -> Option<f64> {
    if trips.is_empty() {
        return None;
    }

    let sum: f64 = trips.iter().map(|t| f64::from(t.distance)).sum();
    let mean = sum / trips.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}

/// Parses the `month` query value; anything but an integer in 1..=12 is rejected.
pub fn validate_month(raw: &str) -> Result<u32, QueryError> {
    match raw.trim().parse::<i64>() {
        Ok(month) if (1..=12).contains(&month) => Ok(month as u32),
        _ => Err(QueryError::bad_parameter("month", raw, "1 <= month <= 12")),
    }
}

/// Existence of the station is checked before the month is looked at.
pub async fn compute_statistics(
    repository: &dyn Repository,
    station_id: i32,
    month: Option<&str>,
) -> Result<StationStatistics, QueryError> {
    if repository.station(station_id).await?.is_none() {
        return Err(QueryError::station_not_found(station_id));
    }

    let month = month.map(validate_month).transpose()?;

    let inbound = repository.trips_arriving_at(station_id, month).await?;
    let outbound = repository.trips_departing_from(station_id, month).await?;

    let top_inbound = repository
        .top_counterparts(station_id, Direction::Inbound, month, TOP_STATIONS)
        .await?
        .into_iter()
        .map(|CounterpartCount { station, total }| TopInbound {
            departure_station: station,
            total,
        })
        .collect();

    let top_outbound = repository
        .top_counterparts(station_id, Direction::Outbound, month, TOP_STATIONS)
        .await?
        .into_iter()
        .map(|CounterpartCount { station, total }| TopOutbound {
            return_station: station,
            total,
        })
        .collect();

    Ok(StationStatistics {
        total_inbound: inbound.len(),
        total_outbound: outbound.len(),
        average_distance_inbound: average_distance(&inbound),
        average_distance_outbound: average_distance(&outbound),
        top_inbound,
        top_outbound,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Station;
    use crate::repository::MemoryRepository;
    use chrono::{NaiveDate, NaiveDateTime};

    fn station(id: i32) -> Station {
        Station {
            id,
            name_fi: format!("Asema {}", id),
            name_se: format!("Station {}", id),
            name_en: format!("Station {}", id),
            address_fi: format!("Katu {}", id),
            address_se: format!("Gatan {}", id),
            city_fi: None,
            city_se: None,
            operator: None,
            capacity: Some(10),
            x: 24.9,
            y: 60.2,
        }
    }

    fn at(month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, month, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn trip(id: i32, from: i32, to: i32, month: u32, distance: f32) -> Trip {
        Trip {
            id,
            departure_time: at(month, 1),
            return_time: at(month, 1) + chrono::Duration::minutes(15),
            departure_station: from,
            return_station: to,
            distance,
            duration: 900,
        }
    }

    /// Station 1 receives trips from 2..=8 and sends trips to 2 and 3.
    fn repository() -> MemoryRepository {
        let stations = (1..=9).map(station).collect();
        let mut trips = Vec::new();
        let mut id = 0;
        let mut push = |from: i32, to: i32, month: u32, distance: f32| {
            id += 1;
            trips.push(trip(id, from, to, month, distance));
        };

        // inbound: station 2 x4, 3 x3, 4 x2, 5..=8 x1
        for (from, count) in [(2, 4), (3, 3), (4, 2), (5, 1), (6, 1), (7, 1), (8, 1)] {
            for n in 0..count {
                push(from, 1, 5 + (n % 2) as u32, 1000.0 + 100.0 * n as f32);
            }
        }
        // outbound
        push(1, 2, 5, 1500.0);
        push(1, 3, 6, 2500.0);
        push(1, 3, 7, 2000.0);
        // unrelated
        push(9, 2, 5, 4000.0);

        MemoryRepository::new(stations, trips)
    }

    #[test]
    fn average_rounds_to_two_decimals() {
        let trips = vec![
            trip(1, 1, 2, 5, 1000.0),
            trip(2, 1, 2, 5, 1000.0),
            trip(3, 1, 2, 5, 1001.0),
        ];
        assert_eq!(average_distance(&trips), Some(1000.33));
        assert_eq!(average_distance(&[]), None);
    }

    #[test]
    fn month_bounds() {
        assert_eq!(validate_month("1").unwrap(), 1);
        assert_eq!(validate_month("12").unwrap(), 12);
        assert_eq!(
            validate_month("0").unwrap_err().to_string(),
            "The parameter month has value 0. Expected 1 <= month <= 12"
        );
        assert_eq!(
            validate_month("13").unwrap_err().to_string(),
            "The parameter month has value 13. Expected 1 <= month <= 12"
        );
        assert_eq!(
            validate_month("June").unwrap_err().to_string(),
            "The parameter month has value June. Expected 1 <= month <= 12"
        );
    }

    #[tokio::test]
    async fn whole_year_statistics() {
        let repo = repository();
        let stats = compute_statistics(&repo, 1, None).await.unwrap();

        assert_eq!(stats.total_inbound, 13);
        assert_eq!(stats.total_outbound, 3);
        assert_eq!(stats.average_distance_outbound, Some(2000.0));

        assert_eq!(stats.top_inbound.len(), 5);
        assert_eq!(
            stats.top_inbound,
            vec![
                TopInbound { departure_station: 2, total: 4 },
                TopInbound { departure_station: 3, total: 3 },
                TopInbound { departure_station: 4, total: 2 },
                // ties on one trip each resolve to the lowest station ids
                TopInbound { departure_station: 5, total: 1 },
                TopInbound { departure_station: 6, total: 1 },
            ]
        );
        assert_eq!(
            stats.top_outbound,
            vec![
                TopOutbound { return_station: 3, total: 2 },
                TopOutbound { return_station: 2, total: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn average_uses_the_counted_trips() {
        let repo = repository();
        let inbound = repo.trips_arriving_at(1, Some(5)).await.unwrap();
        let stats = compute_statistics(&repo, 1, Some("5")).await.unwrap();

        assert_eq!(stats.total_inbound, inbound.len());
        assert_eq!(stats.average_distance_inbound, average_distance(&inbound));
    }

    #[tokio::test]
    async fn months_partition_the_year() {
        let repo = repository();
        let year = compute_statistics(&repo, 1, None).await.unwrap();

        let mut inbound = 0;
        let mut outbound = 0;
        for month in 1..=12 {
            let month = month.to_string();
            let stats = compute_statistics(&repo, 1, Some(month.as_str())).await.unwrap();
            assert!(stats.top_inbound.len() <= 5);
            assert!(stats.top_inbound.windows(2).all(|w| w[0].total >= w[1].total));
            inbound += stats.total_inbound;
            outbound += stats.total_outbound;
        }

        assert_eq!(inbound, year.total_inbound);
        assert_eq!(outbound, year.total_outbound);
    }

    #[tokio::test]
    async fn empty_month_has_no_average() {
        let repo = repository();
        let stats = compute_statistics(&repo, 1, Some("1")).await.unwrap();

        assert_eq!(stats.total_inbound, 0);
        assert_eq!(stats.average_distance_inbound, None);
        assert!(stats.top_inbound.is_empty());

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["averageDistanceInbound"].is_null());
    }

    #[tokio::test]
    async fn unknown_station_is_not_found() {
        let repo = repository();
        for month in ["13", "June"] {
            let err = compute_statistics(&repo, 9999, Some(month)).await.unwrap_err();
            assert_eq!(err.to_string(), "The station with ID = 9999 was not found");
        }
    }

    #[tokio::test]
    async fn month_out_of_range_is_rejected() {
        let repo = repository();
        let err = compute_statistics(&repo, 1, Some("0")).await.unwrap_err();
        assert!(matches!(err, QueryError::BadParameter { name: "month", .. }));
    }
}
