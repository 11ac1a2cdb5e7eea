// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

use serde::{Deserialize, Deserializer, Serialize};

/// One page of a listing, plus the number of rows that matched before paging.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(deserialize_with = "number_or_string")]
    pub page: u32,
    #[serde(deserialize_with = "number_or_string")]
    pub per_page: u32,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, page: u32, per_page: u32, total: i64) -> Self {
        Page {
            data,
            page,
            per_page,
            total,
        }
    }
}

// Query strings hand page numbers around as text, so accept "3" as well as 3.
fn number_or_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u32),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_keys() {
        let page = Page::new(vec![1, 2, 3], 2, 3, 10);
        let json = serde_json::to_value(&page).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"data": [1, 2, 3], "page": 2, "perPage": 3, "total": 10})
        );
    }

    #[test]
    fn coerces_string_page_numbers() {
        let page: Page<i32> =
            serde_json::from_str(r#"{"data": [], "page": "4", "perPage": "25", "total": 0}"#)
                .unwrap();

        assert_eq!(page.page, 4);
        assert_eq!(page.per_page, 25);
    }

    #[test]
    fn rejects_non_numeric_page() {
        let page = serde_json::from_str::<Page<i32>>(
            r#"{"data": [], "page": "first", "perPage": 10, "total": 0}"#,
        );
        assert!(page.is_err());
    }
}
