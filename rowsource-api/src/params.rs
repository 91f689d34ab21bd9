//! Request parameters and responses exchanged with the host `getRows` function.

use serde::{Deserialize, Serialize};

use crate::{GroupKey, Row};

/// Row count reported when the server does not know the total yet.
pub const ROW_COUNT_UNKNOWN: i64 = -1;

/// The page being requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationModel {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PaginationModel {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: 100,
        }
    }
}

/// How filter items combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicOperator {
    #[default]
    And,
    Or,
}

/// A single filter condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterItem {
    pub field: String,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

/// The active filters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterModel {
    pub items: Vec<FilterItem>,
    #[serde(default)]
    pub logic_operator: LogicOperator,
    #[serde(default)]
    pub quick_filter_values: Vec<serde_json::Value>,
    #[serde(default)]
    pub quick_filter_logic_operator: LogicOperator,
}

/// Sort direction for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sorting applied to one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortItem {
    pub field: String,
    pub sort: Option<SortDirection>,
}

/// The active sorting, highest priority first.
pub type SortModel = Vec<SortItem>;

/// Everything that identifies one `getRows` request.
///
/// Two requests with equal parameters are interchangeable for caching. The
/// field order here is the order used by the default cache key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRowsParams {
    pub pagination_model: PaginationModel,
    pub filter_model: FilterModel,
    pub sort_model: SortModel,
    /// Group key path of the parent whose children are requested; empty for
    /// the top level.
    pub group_keys: Vec<GroupKey>,
}

impl GetRowsParams {
    /// Same request, aimed at the children of the group at `group_keys`.
    pub fn with_group_keys(&self, group_keys: Vec<GroupKey>) -> Self {
        Self {
            group_keys,
            ..self.clone()
        }
    }

    /// Whether this requests the top level.
    pub fn is_top_level(&self) -> bool {
        self.group_keys.is_empty()
    }
}

/// What the host returns for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRowsResponse {
    pub rows: Vec<Row>,
    #[serde(default = "unknown_row_count")]
    pub row_count: i64,
}

fn unknown_row_count() -> i64 {
    ROW_COUNT_UNKNOWN
}

impl GetRowsResponse {
    pub fn new(rows: Vec<Row>, row_count: i64) -> Self {
        Self { rows, row_count }
    }

    /// Whether the server reported a total.
    pub fn has_row_count(&self) -> bool {
        self.row_count >= 0
    }
}
