//! The host-supplied data source.

use rowsource_api::{GetRowsParams, GetRowsResponse, GroupKey, Key, Row, RowId};

/// Trait that the embedding application implements to serve rows.
///
/// Only [`get_rows`](DataSource::get_rows) is required. The remaining
/// methods describe how flat rows form a tree and default to a flat list
/// keyed by the row's `id` field.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch the rows matching `params`. An `Err` is recorded as a fetch
    /// failure for the requested level, and so is a panic.
    async fn get_rows(&self, params: GetRowsParams) -> anyhow::Result<GetRowsResponse>;

    /// Identify a row. Rows without an id are dropped.
    ///
    /// Defaults to the `id` field as read by [`Key::from_json`].
    fn get_row_id(&self, row: &Row) -> Option<RowId> {
        row.get("id").and_then(Key::from_json)
    }

    /// The key this row contributes to its descendants' group key path.
    /// Defaults to the row id.
    fn get_group_key(&self, row: &Row) -> Option<GroupKey> {
        self.get_row_id(row)
    }

    /// Number of direct children on the server. `-1` if unknown.
    fn get_children_count(&self, _row: &Row) -> i64 {
        0
    }

    /// Whether the row is a group whose children can be fetched.
    fn has_children(&self, row: &Row) -> bool {
        self.get_children_count(row) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Flat;

    #[async_trait::async_trait]
    impl DataSource for Flat {
        async fn get_rows(&self, _params: GetRowsParams) -> anyhow::Result<GetRowsResponse> {
            Ok(GetRowsResponse::new(vec![], 0))
        }
    }

    struct Counted;

    #[async_trait::async_trait]
    impl DataSource for Counted {
        async fn get_rows(&self, _params: GetRowsParams) -> anyhow::Result<GetRowsResponse> {
            Ok(GetRowsResponse::new(vec![], 0))
        }

        fn get_children_count(&self, row: &Row) -> i64 {
            row.get("descendants").and_then(|v| v.as_i64()).unwrap_or(0)
        }
    }

    #[test]
    fn test_defaults() {
        let row = json!({ "id": "a", "descendants": 3 });
        assert_eq!(Flat.get_row_id(&row), Some(Key::from("a")));
        assert_eq!(Flat.get_group_key(&row), Some(Key::from("a")));
        assert!(!Flat.has_children(&row));
        assert_eq!(Flat.get_row_id(&json!({ "name": "x" })), None);
    }

    #[test]
    fn test_has_children_follows_count() {
        assert!(Counted.has_children(&json!({ "id": 1, "descendants": 3 })));
        // Unknown counts still allow expansion
        assert!(Counted.has_children(&json!({ "id": 1, "descendants": -1 })));
        assert!(!Counted.has_children(&json!({ "id": 1 })));
    }
}
