// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use super::{Column, Comparison, Pagination, Predicate, PredicateValue, QueryParams, SortOrder};
use crate::errors::QueryError;
use crate::models::Station;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Fi,
    Se,
    En,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::Fi => "fi",
            Language::Se => "se",
            Language::En => "en",
        }
    }

    fn parse(code: &str) -> Option<Self> {
        match code {
            "fi" => Some(Language::Fi),
            "se" => Some(Language::Se),
            "en" => Some(Language::En),
            _ => None,
        }
    }
}

// Names exist in all three languages, addresses and cities only in Finnish and Swedish.
const NAME_LANGUAGES: [Language; 3] = [Language::Fi, Language::Se, Language::En];
const ADDRESS_LANGUAGES: [Language; 2] = [Language::Fi, Language::Se];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationColumn {
    NameFi,
    NameSe,
    NameEn,
    AddressFi,
    AddressSe,
    CityFi,
    CitySe,
    Operator,
    Capacity,
}

impl StationColumn {
    fn name(language: Language) -> Self {
        match language {
            Language::Fi => StationColumn::NameFi,
            Language::Se => StationColumn::NameSe,
            Language::En => StationColumn::NameEn,
        }
    }

    fn address(language: Language) -> Self {
        match language {
            Language::Se => StationColumn::AddressSe,
            _ => StationColumn::AddressFi,
        }
    }

    fn city(language: Language) -> Self {
        match language {
            Language::Se => StationColumn::CitySe,
            _ => StationColumn::CityFi,
        }
    }
}

impl Column for StationColumn {
    type Row = Station;

    fn value_of(self, row: &Station) -> Option<PredicateValue> {
        let text = |s: &String| Some(PredicateValue::Text(s.clone()));
        match self {
            StationColumn::NameFi => text(&row.name_fi),
            StationColumn::NameSe => text(&row.name_se),
            StationColumn::NameEn => text(&row.name_en),
            StationColumn::AddressFi => text(&row.address_fi),
            StationColumn::AddressSe => text(&row.address_se),
            StationColumn::CityFi => row.city_fi.as_ref().and_then(text),
            StationColumn::CitySe => row.city_se.as_ref().and_then(text),
            StationColumn::Operator => row.operator.as_ref().and_then(text),
            StationColumn::Capacity => row.capacity.map(PredicateValue::Integer),
        }
    }
}

/// A validated `GET /stations` request.
#[derive(Debug, Clone, PartialEq)]
pub struct StationQuery {
    pub predicates: Vec<Predicate<StationColumn>>,
    pub pagination: Pagination,
    pub sort: SortOrder,
}

impl StationQuery {
    /// Validates parameters in a fixed order and stops at the first bad one.
    ///
    /// `station_count` is the size of the whole table and caps `perPage`.
    pub fn from_params(params: &QueryParams, station_count: i64) -> Result<Self, QueryError> {
        let pagination = Pagination::from_params(params, station_count)?;
        let mut predicates = Vec::new();

        if let Some((text, language)) = localized_text(params, "city", &ADDRESS_LANGUAGES)? {
            predicates.push(contains(StationColumn::city(language), text));
        }

        if let Some((text, language)) = localized_text(params, "address", &ADDRESS_LANGUAGES)? {
            predicates.push(contains(StationColumn::address(language), text));
        }

        if let Some((text, language)) = localized_text(params, "name", &NAME_LANGUAGES)? {
            predicates.push(contains(StationColumn::name(language), text));
        }

        if let Some(operator) = params.first("operator") {
            predicates.push(contains(StationColumn::Operator, operator));
        }

        if let Some(raw) = params.first("capacity") {
            match raw.trim().parse::<i32>() {
                Ok(capacity) if capacity >= 0 => predicates.push(Predicate::new(
                    StationColumn::Capacity,
                    Comparison::Equals,
                    PredicateValue::Integer(capacity),
                )),
                _ => return Err(QueryError::bad_parameter("capacity", raw, ">= 0")),
            }
        }

        let sort = SortOrder::from_params(params)?;

        Ok(StationQuery {
            predicates,
            pagination,
            sort,
        })
    }

    pub fn matches(&self, station: &Station) -> bool {
        self.predicates.iter().all(|p| p.matches(station))
    }
}

fn contains(column: StationColumn, text: &str) -> Predicate<StationColumn> {
    Predicate::new(
        column,
        Comparison::Contains,
        PredicateValue::Text(text.to_string()),
    )
}

/// Reads `name=<text>` or `name=<text>&name=<language>`. Finnish is the default language.
fn localized_text<'a>(
    params: &'a QueryParams,
    name: &'static str,
    allowed: &[Language],
) -> Result<Option<(&'a str, Language)>, QueryError> {
    let values = params.all(name);
    let Some(text) = values.first().copied() else {
        return Ok(None);
    };

    let language = match values.get(1) {
        None => Some(Language::Fi),
        Some(code) => Language::parse(code).filter(|l| allowed.contains(l)),
    };

    match language {
        Some(language) => Ok(Some((text, language))),
        None => {
            let codes = allowed
                .iter()
                .map(|l| l.code())
                .collect::<Vec<_>>()
                .join(", ");
            Err(QueryError::bad_parameter(
                name,
                values.join(","),
                format!("language in [{}]", codes),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(raw: &str) -> Result<StationQuery, QueryError> {
        StationQuery::from_params(&QueryParams::parse(raw), 500)
    }

    fn station() -> Station {
        Station {
            id: 501,
            name_fi: "Hanasaari".to_string(),
            name_se: "Hanaholmen".to_string(),
            name_en: "Hanasaari".to_string(),
            address_fi: "Hanasaarenranta 1".to_string(),
            address_se: "Hanaholmsstranden 1".to_string(),
            city_fi: Some("Espoo".to_string()),
            city_se: Some("Esbo".to_string()),
            operator: Some("CityBike Finland".to_string()),
            capacity: Some(10),
            x: 24.840319,
            y: 60.16582,
        }
    }

    #[test]
    fn no_filters() {
        let q = query("page=1&perPage=10").unwrap();
        assert!(q.predicates.is_empty());
        assert_eq!(q.sort, SortOrder::Asc);
        assert!(q.matches(&station()));
    }

    #[test]
    fn language_selects_column() {
        let q = query("page=1&perPage=10&city=Esbo&city=se&name=Hanaholmen&name=se").unwrap();
        assert_eq!(
            q.predicates,
            vec![
                contains(StationColumn::CitySe, "Esbo"),
                contains(StationColumn::NameSe, "Hanaholmen"),
            ]
        );
        assert!(q.matches(&station()));
    }

    #[test]
    fn finnish_is_the_default_language() {
        let q = query("page=1&perPage=10&address=Hanasaarenranta").unwrap();
        assert_eq!(
            q.predicates,
            vec![contains(StationColumn::AddressFi, "Hanasaarenranta")]
        );
    }

    #[test]
    fn english_is_only_valid_for_names() {
        let err = query("page=1&perPage=10&city=Espoo&city=en").unwrap_err();
        assert_eq!(
            err.to_string(),
            "The parameter city has value Espoo,en. Expected language in [fi, se]"
        );

        let err = query("page=1&perPage=10&address=Gallen-Kallelas&address=en").unwrap_err();
        assert_eq!(
            err.to_string(),
            "The parameter address has value Gallen-Kallelas,en. Expected language in [fi, se]"
        );

        let err = query("page=1&perPage=10&name=Sepetlahdentie&name=ro").unwrap_err();
        assert_eq!(
            err.to_string(),
            "The parameter name has value Sepetlahdentie,ro. Expected language in [fi, se, en]"
        );

        assert!(query("page=1&perPage=10&name=Hanasaari&name=en").is_ok());
    }

    #[test]
    fn capacity_must_be_non_negative() {
        let err = query("page=1&perPage=10&capacity=-1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "The parameter capacity has value -1. Expected >= 0"
        );

        let q = query("page=1&perPage=10&capacity=0").unwrap();
        assert_eq!(
            q.predicates,
            vec![Predicate::new(
                StationColumn::Capacity,
                Comparison::Equals,
                PredicateValue::Integer(0)
            )]
        );
    }

    #[test]
    fn pagination_is_checked_before_filters() {
        let err = query("page=0&perPage=10&capacity=-1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "The parameter page has value 0. Expected >= 1"
        );
    }

    #[test]
    fn every_filter_must_hold() {
        let q = query("page=1&perPage=10&operator=CityBike&capacity=10&city=Espoo").unwrap();
        assert_eq!(q.predicates.len(), 3);
        assert!(q.matches(&station()));

        let mut other = station();
        other.capacity = Some(12);
        assert!(!q.matches(&other));

        let mut no_city = station();
        no_city.city_fi = None;
        assert!(!q.matches(&no_city));
    }

    #[test]
    fn text_matching_is_case_sensitive() {
        let q = query("page=1&perPage=10&operator=citybike").unwrap();
        assert!(!q.matches(&station()));
    }
}
