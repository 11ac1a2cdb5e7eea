// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// A bike station. Names and addresses come in Finnish and Swedish (names also in English).
#[derive(Queryable, Selectable, Insertable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::stations)]
pub struct Station {
    pub id: i32,
    pub name_fi: String,
    pub name_se: String,
    pub name_en: String,
    pub address_fi: String,
    pub address_se: String,
    pub city_fi: Option<String>,
    pub city_se: Option<String>,
    pub operator: Option<String>,
    pub capacity: Option<i32>,
    pub x: f32,
    pub y: f32,
}

/// A journey between two stations.
///
/// `distance` is stored in meters and `duration` in seconds.
#[derive(Queryable, Selectable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::trips)]
pub struct Trip {
    pub id: i32,
    pub departure_time: NaiveDateTime,
    pub return_time: NaiveDateTime,
    pub departure_station: i32,
    pub return_station: i32,
    pub distance: f32,
    pub duration: i32,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::trips)]
pub struct NewTrip {
    pub departure_time: NaiveDateTime,
    pub return_time: NaiveDateTime,
    pub departure_station: i32,
    pub return_station: i32,
    pub distance: f32,
    pub duration: i32,
}

/// A trip with both of its stations resolved, as served by the trip listing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TripWithStations {
    pub id: i32,
    pub departure_time: NaiveDateTime,
    pub return_time: NaiveDateTime,
    pub departure_station: Station,
    pub return_station: Station,
    pub distance: f32,
    pub duration: i32,
}

impl TripWithStations {
    pub fn new(trip: Trip, departure_station: Station, return_station: Station) -> Self {
        TripWithStations {
            id: trip.id,
            departure_time: trip.departure_time,
            return_time: trip.return_time,
            departure_station,
            return_station,
            distance: trip.distance,
            duration: trip.duration,
        }
    }
}
