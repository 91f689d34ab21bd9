//! The cache contract shared by the built-in cache and host-supplied ones.

use std::fmt;

use rowsource_api::{GetRowsParams, GetRowsResponse};

use crate::CacheError;

/// A derived, comparable key identifying one set of request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(pub String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        CacheKey(s.to_string())
    }
}

/// Trait that every response cache must implement.
///
/// All methods take `&self`: the cache is shared between the coordinator and
/// host code, so implementations keep their storage behind interior
/// mutability.
pub trait ResponseCache: Send + Sync {
    /// Derive the lookup key for a request. Must be a pure function of
    /// `params`.
    fn derive_key(&self, params: &GetRowsParams) -> Result<CacheKey, CacheError> {
        default_cache_key(params)
    }

    /// Look up a response. `None` is a miss.
    fn get(&self, key: &CacheKey) -> Option<GetRowsResponse>;

    /// Store a response, replacing any previous one for the key.
    fn set(&self, key: CacheKey, response: GetRowsResponse);

    /// Drop every entry.
    fn clear(&self);
}

/// The built-in key: the JSON array
/// `[paginationModel, filterModel, sortModel, groupKeys]`.
///
/// Struct fields serialize in declaration order and JSON objects inside filter
/// values serialize with sorted keys, so structurally equal parameters always
/// produce the same string.
pub fn default_cache_key(params: &GetRowsParams) -> Result<CacheKey, CacheError> {
    let key = serde_json::to_string(&(
        &params.pagination_model,
        &params.filter_model,
        &params.sort_model,
        &params.group_keys,
    ))?;
    Ok(CacheKey(key))
}
