// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use super::{SharedRepository, reject};
use crate::errors::{ApiError, QueryError};
use crate::models::TripWithStations;
use crate::page::Page;
use crate::query::{QueryParams, TripQuery};
use crate::repository::Repository;
use actix_web::{HttpRequest, HttpResponse, web};

async fn trip_page(
    repository: &dyn Repository,
    params: &QueryParams,
) -> Result<Page<TripWithStations>, QueryError> {
    let trip_count = repository.trip_count().await?;
    let station_ids = repository.station_ids().await?;
    let query = TripQuery::from_params(params, trip_count, &station_ids)?;
    let listing = repository.trips(&query).await?;

    Ok(Page::new(
        listing.items,
        query.pagination.page,
        query.pagination.per_page,
        listing.total,
    ))
}

/// Paginated trip listing. `distance` is given in kilometers, `duration` in minutes.
#[actix_web::get("/trips")]
pub async fn list_trips(
    repository: web::Data<SharedRepository>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let params = QueryParams::parse(req.query_string());
    let page = trip_page(repository.get_ref().as_ref(), &params)
        .await
        .map_err(reject(&req))?;

    Ok(HttpResponse::Ok().json(page))
}
