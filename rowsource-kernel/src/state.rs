//! Data source state - per-row loading and error flags.

use std::collections::{HashMap, HashSet};

use rowsource_api::RowId;

use crate::FetchError;

/// Fetch state of one row's children.
#[derive(Debug, Clone, Default)]
pub enum RowFetchState {
    #[default]
    Idle,
    Loading,
    Errored(FetchError),
}

/// Loading and error flags, per group row and for the top level.
///
/// Loading and error are tracked independently: a retry keeps showing the
/// previous error until it succeeds.
#[derive(Debug, Default)]
pub struct DataSourceState {
    /// Rows whose children are being fetched.
    loading: HashSet<RowId>,

    /// Last failure fetching a row's children.
    errors: HashMap<RowId, FetchError>,

    /// Whether the top level is being fetched.
    root_loading: bool,

    /// Last failure fetching the top level.
    root_error: Option<FetchError>,
}

impl DataSourceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_loading(&mut self, id: &RowId, loading: bool) {
        if loading {
            self.loading.insert(id.clone());
        } else {
            self.loading.remove(id);
        }
    }

    /// Record or clear (`None`) a failure.
    pub fn set_error(&mut self, id: &RowId, error: Option<FetchError>) {
        match error {
            Some(error) => {
                self.errors.insert(id.clone(), error);
            }
            None => {
                self.errors.remove(id);
            }
        }
    }

    pub fn is_loading(&self, id: &RowId) -> bool {
        self.loading.contains(id)
    }

    pub fn error(&self, id: &RowId) -> Option<&FetchError> {
        self.errors.get(id)
    }

    /// The combined view used by the grouping cell.
    pub fn fetch_state(&self, id: &RowId) -> RowFetchState {
        if self.is_loading(id) {
            RowFetchState::Loading
        } else if let Some(error) = self.error(id) {
            RowFetchState::Errored(error.clone())
        } else {
            RowFetchState::Idle
        }
    }

    pub fn set_root_loading(&mut self, loading: bool) {
        self.root_loading = loading;
    }

    pub fn set_root_error(&mut self, error: Option<FetchError>) {
        self.root_error = error;
    }

    pub fn is_root_loading(&self) -> bool {
        self.root_loading
    }

    pub fn root_error(&self) -> Option<&FetchError> {
        self.root_error.as_ref()
    }

    /// Forget rows that left the data set.
    pub fn remove_rows(&mut self, ids: &[RowId]) {
        for id in ids {
            self.loading.remove(id);
            self.errors.remove(id);
        }
    }

    /// Clear all per-row flags. The top-level flags are kept.
    pub fn clear(&mut self) {
        self.loading.clear();
        self.errors.clear();
    }

    /// Number of rows currently loading.
    pub fn loading_count(&self) -> usize {
        self.loading.len()
    }
}
