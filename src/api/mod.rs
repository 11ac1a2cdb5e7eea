// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

//! HTTP routes. Every handler reads from the injected [`SharedRepository`].

pub mod stations;
pub mod trips;


use crate::errors::{ApiError, QueryError};
use crate::repository::Repository;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use std::sync::Arc;

pub type SharedRepository = Arc<dyn Repository>;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(stations::list_stations)
        .service(stations::get_station)
        .service(stations::station_statistics)
        .service(trips::list_trips)
        .service(health);
}

#[actix_web::get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok()
        .insert_header(("Content-Type", "text/plain"))
        .insert_header(("Cache-Control", "no-cache"))
        .body("ok")
}

/// Binds an error to the path and query that caused it.
fn reject(req: &HttpRequest) -> impl FnOnce(QueryError) -> ApiError + '_ {
    move |error| ApiError::new(error, req.uri().to_string())
}
