//! Events emitted by the data source to subscribers (rendering, error overlays, etc.)

use serde::{Deserialize, Serialize};

use crate::{GetRowsParams, RowId};

/// Unique identifier for an issued fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FetchId(pub u64);

/// What a fetch is loading.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FetchTarget {
    /// The top-level rows.
    TopLevel,
    /// The children of a group row.
    Children(RowId),
}

impl FetchTarget {
    pub fn row_id(&self) -> Option<&RowId> {
        match self {
            FetchTarget::TopLevel => None,
            FetchTarget::Children(id) => Some(id),
        }
    }
}

/// Events emitted by the data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DataSourceEvent {
    /// A request was handed to the host.
    FetchStarted {
        fetch_id: FetchId,
        target: FetchTarget,
        params: GetRowsParams,
    },

    /// Rows were merged into the tree.
    RowsLoaded {
        target: FetchTarget,
        from_cache: bool,
        row_count: i64,
    },

    /// The host failed a request. Mirrors the grid's server-side error callback.
    FetchFailed {
        target: FetchTarget,
        params: GetRowsParams,
        message: String,
    },

    /// A fetch resolved after its parameters went out of date.
    FetchDiscarded {
        fetch_id: FetchId,
        target: FetchTarget,
    },

    /// The response cache was cleared.
    CacheCleared,

    /// Per-row loading and error state was reset.
    StateReset,
}
