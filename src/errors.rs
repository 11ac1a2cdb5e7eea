// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of the storage layer. Never caused by the caller.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Database query failed: {0}")]
    Query(#[from] diesel::result::Error),
    #[error("Could not get a database connection: {0}")]
    Pool(#[from] bb8::RunError<diesel_async::pooled_connection::PoolError>),
    #[error("Predicate cannot be applied to its column: {0}")]
    UnsupportedPredicate(String),
}

/// Errors produced while answering a single request.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("The parameter {name} has value {found}. Expected {expected}")]
    BadParameter {
        name: &'static str,
        found: String,
        expected: String,
    },
    #[error("The {what} with {property} = {value} was not found")]
    NotFound {
        what: &'static str,
        property: &'static str,
        value: String,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl QueryError {
    pub fn bad_parameter(
        name: &'static str,
        found: impl std::fmt::Display,
        expected: impl Into<String>,
    ) -> Self {
        QueryError::BadParameter {
            name,
            found: found.to_string(),
            expected: expected.into(),
        }
    }

    pub fn station_not_found(value: impl std::fmt::Display) -> Self {
        QueryError::NotFound {
            what: "station",
            property: "ID",
            value: value.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            QueryError::BadParameter { .. } => StatusCode::BAD_REQUEST,
            QueryError::NotFound { .. } => StatusCode::NOT_FOUND,
            QueryError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn id(&self) -> &'static str {
        match self {
            QueryError::BadParameter { .. } => "Badly formatted parameter",
            QueryError::NotFound { .. } => "Not found",
            QueryError::Repository(_) => "Internal server error",
        }
    }

    fn title(&self) -> String {
        match self {
            QueryError::BadParameter { .. } => {
                "A required missing parameter is badly formatted".to_string()
            }
            QueryError::NotFound { what, .. } => format!("{} not found", what),
            QueryError::Repository(_) => "Internal server error".to_string(),
        }
    }
}

/// The JSON body sent with every non-2xx response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorEnvelope {
    pub id: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub instance: String,
}

/// A [`QueryError`] bound to the request that produced it.
#[derive(Error, Debug)]
#[error("{error} ({instance})")]
pub struct ApiError {
    pub error: QueryError,
    pub instance: String,
}

impl ApiError {
    pub fn new(error: QueryError, instance: impl Into<String>) -> Self {
        ApiError {
            error,
            instance: instance.into(),
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let detail = match &self.error {
            // storage details stay in the logs
            QueryError::Repository(_) => "The request could not be completed".to_string(),
            other => other.to_string(),
        };

        ErrorEnvelope {
            id: self.error.id().to_string(),
            title: self.error.title(),
            status: self.error.status().as_u16(),
            detail,
            instance: self.instance.clone(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.error.status()
    }

    fn error_response(&self) -> HttpResponse {
        match &self.error {
            QueryError::Repository(err) => {
                tracing::error!(instance = %self.instance, "{}", err)
            }
            other => tracing::debug!(instance = %self.instance, "{}", other),
        }

        HttpResponse::build(self.status_code()).json(self.envelope())
    }
}
