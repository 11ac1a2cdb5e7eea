// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use super::{SharedRepository, reject};
use crate::errors::{ApiError, QueryError};
use crate::models::Station;
use crate::page::Page;
use crate::query::{QueryParams, StationQuery};
use crate::repository::Repository;
use crate::statistics::{StationStatistics, compute_statistics};
use actix_web::{HttpRequest, HttpResponse, web};

async fn station_page(
    repository: &dyn Repository,
    params: &QueryParams,
) -> Result<Page<Station>, QueryError> {
    let station_count = repository.station_count().await?;
    let query = StationQuery::from_params(params, station_count)?;
    let listing = repository.stations(&query).await?;

    Ok(Page::new(
        listing.items,
        query.pagination.page,
        query.pagination.per_page,
        listing.total,
    ))
}

async fn find_station(repository: &dyn Repository, raw_id: &str) -> Result<Station, QueryError> {
    let Ok(id) = raw_id.parse::<i32>() else {
        return Err(QueryError::station_not_found(raw_id));
    };

    repository
        .station(id)
        .await?
        .ok_or_else(|| QueryError::station_not_found(id))
}

async fn statistics(
    repository: &dyn Repository,
    raw_id: &str,
    params: &QueryParams,
) -> Result<StationStatistics, QueryError> {
    let Ok(id) = raw_id.parse::<i32>() else {
        return Err(QueryError::station_not_found(raw_id));
    };

    compute_statistics(repository, id, params.first("month")).await
}

/// Paginated, filterable station listing.
#[actix_web::get("/stations")]
pub async fn list_stations(
    repository: web::Data<SharedRepository>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let params = QueryParams::parse(req.query_string());
    let page = station_page(repository.get_ref().as_ref(), &params)
        .await
        .map_err(reject(&req))?;

    Ok(HttpResponse::Ok().json(page))
}

#[actix_web::get("/stations/{station_id}")]
pub async fn get_station(
    repository: web::Data<SharedRepository>,
    path: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let station = find_station(repository.get_ref().as_ref(), &path)
        .await
        .map_err(reject(&req))?;

    Ok(HttpResponse::Ok().json(station))
}

/// Totals, average distances and top counterpart stations, optionally for one `month`.
#[actix_web::get("/stations/{station_id}/stats")]
pub async fn station_statistics(
    repository: web::Data<SharedRepository>,
    path: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let params = QueryParams::parse(req.query_string());
    let stats = statistics(repository.get_ref().as_ref(), &path, &params)
        .await
        .map_err(reject(&req))?;

    Ok(HttpResponse::Ok().json(stats))
}
