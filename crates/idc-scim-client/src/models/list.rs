//! List responses.

use serde::Deserialize;
use serde_json::{Map, Value};

/// One page of a listing.
///
/// The directory paginates with `nextCursor` instead of `startIndex`, and the
/// casing of that key is not stable. An empty cursor means there is no next
/// page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawListPage")]
pub struct ListPage {
    pub resources: Vec<Value>,
    pub total_results: Option<u64>,
    pub next_cursor: Option<String>,
    pub items_per_page: Option<u64>,
    pub start_index: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawListPage {
    #[serde(rename = "Resources", alias = "resources", default, deserialize_with = "super::nullable")]
    resources: Vec<Value>,
    total_results: Option<u64>,
    items_per_page: Option<u64>,
    start_index: Option<u64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<RawListPage> for ListPage {
    fn from(raw: RawListPage) -> Self {
        let next_cursor = raw
            .extra
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("nextCursor"))
            .and_then(|(_, v)| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            resources: raw.resources,
            total_results: raw.total_results,
            next_cursor,
            items_per_page: raw.items_per_page,
            start_index: raw.start_index,
        }
    }
}
