// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

//! Turns listing query strings into validated predicates and page bounds.
//!
//! Predicates are plain `{column, comparison, value}` triples. Repositories
//! translate them into bound query parameters; user text is never spliced
//! into SQL.

pub mod stations;
pub mod trips;

use crate::errors::QueryError;

pub use stations::{Language, StationColumn, StationQuery};
pub use trips::{TripColumn, TripQuery};

/// Multi-valued view over a raw query string.
///
/// Keys may repeat (`city=Espoo&city=fi`). Empty values count as absent.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn parse(query_string: &str) -> Self {
        QueryParams {
            pairs: url::form_urlencoded::parse(query_string.as_bytes())
                .into_owned()
                .filter(|(_, value)| !value.is_empty())
                .collect(),
        }
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn all(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equals,
    /// Case-sensitive substring match.
    Contains,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredicateValue {
    Text(String),
    Integer(i32),
    Real(f32),
}

/// Resolves a column to its value on an in-memory row.
pub trait Column: Copy {
    type Row;

    fn value_of(self, row: &Self::Row) -> Option<PredicateValue>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate<C> {
    pub column: C,
    pub comparison: Comparison,
    pub value: PredicateValue,
}

impl<C: Column> Predicate<C> {
    pub fn new(column: C, comparison: Comparison, value: PredicateValue) -> Self {
        Predicate {
            column,
            comparison,
            value,
        }
    }

    /// Null columns never match.
    pub fn matches(&self, row: &C::Row) -> bool {
        let Some(field) = self.column.value_of(row) else {
            return false;
        };

        match (self.comparison, &field, &self.value) {
            (Comparison::Equals, field, value) => field == value,
            (Comparison::Contains, PredicateValue::Text(haystack), PredicateValue::Text(needle)) => {
                haystack.contains(needle.as_str())
            }
            (Comparison::Contains, _, _) => false,
        }
    }
}

/// Builds a `LIKE` pattern matching `needle` anywhere, with its own wildcards escaped.
pub fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    /// Validates `page` and `perPage`; `perPage` may not exceed `row_count`.
    pub fn from_params(params: &QueryParams, row_count: i64) -> Result<Self, QueryError> {
        let page = match params.first("page") {
            None => return Err(QueryError::bad_parameter("page", "missing", ">= 1")),
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(page) if page >= 1 => page,
                _ => return Err(QueryError::bad_parameter("page", raw, ">= 1")),
            },
        };

        let expected = format!("1 <= perPage <= {}", row_count);
        let per_page = match params.first("perPage") {
            None => return Err(QueryError::bad_parameter("perPage", "missing", expected)),
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(per_page) if per_page >= 1 && i64::from(per_page) <= row_count => per_page,
                _ => return Err(QueryError::bad_parameter("perPage", raw, expected)),
            },
        };

        Ok(Pagination { page, per_page })
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    /// Applies the bounds to an already filtered and ordered sequence.
    pub fn slice<T>(&self, rows: Vec<T>) -> Vec<T> {
        rows.into_iter()
            .skip(self.offset() as usize)
            .take(self.per_page as usize)
            .collect()
    }
}

/// Ordering on the primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn from_params(params: &QueryParams) -> Result<Self, QueryError> {
        match params.first("sort") {
            None => Ok(SortOrder::Asc),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "asc" => Ok(SortOrder::Asc),
                "desc" => Ok(SortOrder::Desc),
                _ => Err(QueryError::bad_parameter("sort", raw, "sort in [asc, desc]")),
            },
        }
    }
}
