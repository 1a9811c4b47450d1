//! Wire types for NetSuite record endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A complete record as returned by `GET /record/v1/{type}/{id}`.
pub type Record = Map<String, Value>;

/// Response of a list call: `GET /record/v1/{type}?limit=&offset=`.
///
/// List items are stubs carrying the record id and links, not full records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    #[serde(default)]
    pub items: Vec<ListItem>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub total_results: Option<u64>,
}

/// A list item stub.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

/// Query parameters for a list call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: u32,
    pub offset: u64,
    /// NetSuite query filter, e.g. `lastModifiedDate ON_OR_AFTER "01/15/2024"`.
    pub q: Option<String>,
}

impl ListQuery {
    pub fn new(limit: u32, offset: u64) -> Self {
        Self {
            limit,
            offset,
            q: None,
        }
    }

    pub fn with_filter(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("limit".to_string(), self.limit.to_string()),
            ("offset".to_string(), self.offset.to_string()),
        ];
        if let Some(q) = &self.q {
            params.push(("q".to_string(), q.clone()));
        }
        params
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_response_parses_netsuite_page() {
        let page: ListResponse = serde_json::from_value(json!({
            "links": [{"rel": "next", "href": "https://x/vendor?limit=2&offset=2"}],
            "count": 2,
            "hasMore": true,
            "items": [
                {"links": [{"rel": "self", "href": "https://x/vendor/1"}], "id": "1"},
                {"links": [], "id": 2}
            ],
            "offset": 0,
            "totalResults": 3
        }))
        .unwrap();

        assert!(page.has_more);
        assert_eq!(page.total_results, Some(3));
        let ids: Vec<&str> = page.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_missing_has_more_means_last_page() {
        let page: ListResponse = serde_json::from_value(json!({"items": []})).unwrap();
        assert!(!page.has_more);
    }

    #[test]
    fn test_list_query_params() {
        let query = ListQuery::new(100, 200).with_filter("isInactive IS false");
        assert_eq!(
            query.to_params(),
            vec![
                ("limit".to_string(), "100".to_string()),
                ("offset".to_string(), "200".to_string()),
                ("q".to_string(), "isInactive IS false".to_string()),
            ]
        );
    }
}
