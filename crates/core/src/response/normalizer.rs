//! Tolerant list extraction
//!
//! Backends disagree on where the rows and the pagination numbers live.
//! `normalize_list` looks in the usual places and never fails.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const FALLBACK_LIST_KEYS: &[&str] = &["list", "items", "records", "rows", "results"];
const PAGE_KEYS: &[&str] = &["page", "current", "currentPage", "pageNum", "pageNo"];
const PAGE_SIZE_KEYS: &[&str] = &["pageSize", "page_size", "size", "limit", "perPage", "per_page"];
const TOTAL_KEYS: &[&str] = &["total", "totalCount", "total_count", "count", "totalElements"];

/// Caller-supplied fallbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDefaults {
    pub page: u64,
    pub page_size: Option<u64>,
    pub total: Option<u64>,
}

impl Default for PageDefaults {
    fn default() -> Self {
        Self { page: 1, page_size: None, total: None }
    }
}

/// A list plus its pagination numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedList {
    pub list: Vec<Value>,
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
}

/// Extract a list and page/pageSize/total from an arbitrary payload.
///
/// The data node is `payload.data` when that is an object or array,
/// otherwise the payload itself. The list is the first array found under
/// `candidates`, then under the common fallback keys, or the node itself if
/// it is an array. Pagination prefers an explicit block (`meta.pagination`,
/// `pagination`, or `meta`) over sibling fields on the data node.
pub fn normalize_list(payload: &Value, candidates: &[&str], defaults: PageDefaults) -> NormalizedList {
    let node = match payload.get("data") {
        Some(data @ (Value::Object(_) | Value::Array(_))) => data,
        _ => payload,
    };

    let list = extract_list(node, candidates);

    let blocks = pagination_blocks(payload, node);
    let lookup = |keys: &[&str]| blocks.iter().find_map(|block| number_at(block, keys));

    let len = list.len() as u64;
    let page = lookup(PAGE_KEYS).unwrap_or(defaults.page);
    let page_size = lookup(PAGE_SIZE_KEYS).or(defaults.page_size).unwrap_or(len);
    let total = lookup(TOTAL_KEYS).or(defaults.total).unwrap_or(len);

    NormalizedList { list, page, page_size, total }
}

fn extract_list(node: &Value, candidates: &[&str]) -> Vec<Value> {
    if let Value::Array(items) = node {
        return items.clone();
    }
    candidates
        .iter()
        .chain(FALLBACK_LIST_KEYS)
        .find_map(|key| node.get(*key).and_then(Value::as_array))
        .cloned()
        .unwrap_or_default()
}

/// Candidate objects holding pagination numbers, most explicit first
fn pagination_blocks<'a>(payload: &'a Value, node: &'a Value) -> Vec<&'a Map<String, Value>> {
    let meta = payload.get("meta");
    let node_meta = node.get("meta");

    let explicit = [
        meta.and_then(|m| m.get("pagination")),
        node.get("pagination"),
        payload.get("pagination"),
        meta,
        node_meta,
    ];

    explicit
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .filter(|block| has_page_keys(block))
        .chain(node.as_object())
        .collect()
}

fn has_page_keys(block: &Map<String, Value>) -> bool {
    PAGE_KEYS
        .iter()
        .chain(PAGE_SIZE_KEYS)
        .chain(TOTAL_KEYS)
        .any(|key| block.contains_key(*key))
}

fn number_at(block: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| block.get(*key).and_then(as_count))
}

/// Non-negative integer from a number or numeric string
fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_sibling_fields_on_data_node() {
        let payload = json!({"data": {"users": [{"id": "10"}], "page": 3, "pageSize": 5, "total": 12}});
        let normalized = normalize_list(&payload, &["users"], PageDefaults::default());
        assert_eq!(
            normalized,
            NormalizedList { list: vec![json!({"id": "10"})], page: 3, page_size: 5, total: 12 }
        );
    }

    #[test]
    fn test_explicit_pagination_block_wins() {
        let payload = json!({
            "data": {"items": [1, 2], "page": 9},
            "meta": {"pagination": {"current": "2", "size": 2, "totalElements": 40}}
        });
        let normalized = normalize_list(&payload, &[], PageDefaults::default());
        assert_eq!(normalized.list.len(), 2);
        assert_eq!((normalized.page, normalized.page_size, normalized.total), (2, 2, 40));
    }

    #[test]
    fn test_array_data_with_meta() {
        let payload = json!({"data": [{"id": 1}, {"id": 2}, {"id": 3}], "meta": {"total": 30, "limit": 3}});
        let normalized = normalize_list(&payload, &["tenants"], PageDefaults::default());
        assert_eq!(normalized.list.len(), 3);
        assert_eq!((normalized.page, normalized.page_size, normalized.total), (1, 3, 30));
    }

    #[test]
    fn test_defaults_and_list_length_fallbacks() {
        let payload = json!({"records": [1, 2, 3, 4]});
        let normalized = normalize_list(&payload, &[], PageDefaults::default());
        assert_eq!((normalized.page, normalized.page_size, normalized.total), (1, 4, 4));

        let defaults = PageDefaults { page: 2, page_size: Some(20), total: Some(99) };
        let normalized = normalize_list(&payload, &[], defaults);
        assert_eq!((normalized.page, normalized.page_size, normalized.total), (2, 20, 99));
    }

    #[test]
    fn test_unrecognized_payload_yields_empty_list() {
        let normalized = normalize_list(&json!("nope"), &["users"], PageDefaults::default());
        assert!(normalized.list.is_empty());
        assert_eq!((normalized.page, normalized.page_size, normalized.total), (1, 0, 0));
    }
}
