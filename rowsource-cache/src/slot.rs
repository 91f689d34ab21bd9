//! Cache selection - the built-in cache, a host override and the disabled flag.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use rowsource_api::{GetRowsParams, GetRowsResponse};

use crate::{CacheError, CacheKey, MemoryCache, ResponseCache};

/// Holds the cache implementation currently in use.
///
/// The built-in [`MemoryCache`] is always kept so that removing a host
/// override falls back to it with its contents intact.
pub struct CacheSlot {
    default: Arc<MemoryCache>,
    current: RwLock<Arc<dyn ResponseCache>>,
    overridden: AtomicBool,
    disabled: Arc<AtomicBool>,
}

impl CacheSlot {
    /// Create a slot serving `default`.
    pub fn new(default: MemoryCache) -> Self {
        let default = Arc::new(default);
        let current: Arc<dyn ResponseCache> = default.clone();
        Self {
            current: RwLock::new(current),
            default,
            overridden: AtomicBool::new(false),
            disabled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Swap the implementation. `None` restores the built-in cache.
    ///
    /// Handles taken earlier keep the instance they were created with.
    pub fn replace(&self, cache: Option<Arc<dyn ResponseCache>>) {
        let next: Arc<dyn ResponseCache> = match cache {
            Some(cache) => {
                self.overridden.store(true, Ordering::SeqCst);
                cache
            }
            None => {
                self.overridden.store(false, Ordering::SeqCst);
                self.default.clone() as Arc<dyn ResponseCache>
            }
        };
        *self
            .current
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = next;
        tracing::debug!("response cache replaced");
    }

    /// Whether a host-supplied cache is in use.
    pub fn is_overridden(&self) -> bool {
        self.overridden.load(Ordering::SeqCst)
    }

    /// The built-in cache, whether or not it is current.
    pub fn default_cache(&self) -> &Arc<MemoryCache> {
        &self.default
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::SeqCst);
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    /// Capture the current implementation.
    pub fn handle(&self) -> CacheHandle {
        let cache = self
            .current
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        CacheHandle {
            cache,
            disabled: self.disabled.clone(),
        }
    }

    /// Look up the cached response for `params`.
    pub fn get_cache_data(
        &self,
        params: &GetRowsParams,
    ) -> Result<Option<GetRowsResponse>, CacheError> {
        self.handle().get_data(params)
    }

    /// Store `response` as the answer to `params`.
    pub fn set_cache_data(
        &self,
        params: &GetRowsParams,
        response: GetRowsResponse,
    ) -> Result<(), CacheError> {
        self.handle().set_data(params, response)
    }

    /// Clear the current implementation.
    pub fn clear_cache(&self) {
        self.handle().clear();
    }
}

impl Default for CacheSlot {
    fn default() -> Self {
        Self::new(MemoryCache::new())
    }
}

impl fmt::Debug for CacheSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSlot")
            .field("overridden", &self.is_overridden())
            .field("disabled", &self.is_disabled())
            .finish()
    }
}

/// One cache instance plus the shared disabled flag.
///
/// The flag is read before every operation, so disabling the cache takes
/// effect for handles that already exist.
#[derive(Clone)]
pub struct CacheHandle {
    cache: Arc<dyn ResponseCache>,
    disabled: Arc<AtomicBool>,
}

impl CacheHandle {
    fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    /// Derive the key for `params`. `Ok(None)` when caching is disabled.
    pub fn key_for(&self, params: &GetRowsParams) -> Result<Option<CacheKey>, CacheError> {
        if self.is_disabled() {
            return Ok(None);
        }
        self.cache.derive_key(params).map(Some)
    }

    pub fn get(&self, key: &CacheKey) -> Option<GetRowsResponse> {
        if self.is_disabled() {
            return None;
        }
        self.cache.get(key)
    }

    pub fn set(&self, key: CacheKey, response: GetRowsResponse) {
        if self.is_disabled() {
            return;
        }
        self.cache.set(key, response);
    }

    pub fn clear(&self) {
        if self.is_disabled() {
            return;
        }
        self.cache.clear();
    }

    pub fn get_data(&self, params: &GetRowsParams) -> Result<Option<GetRowsResponse>, CacheError> {
        Ok(self.key_for(params)?.and_then(|key| self.get(&key)))
    }

    pub fn set_data(
        &self,
        params: &GetRowsParams,
        response: GetRowsResponse,
    ) -> Result<(), CacheError> {
        if let Some(key) = self.key_for(params)? {
            self.set(key, response);
        }
        Ok(())
    }

    /// Whether two handles point at the same cache instance.
    pub fn same_instance(&self, other: &CacheHandle) -> bool {
        Arc::ptr_eq(&self.cache, &other.cache)
    }
}

impl fmt::Debug for CacheHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheHandle")
            .field("disabled", &self.is_disabled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowsource_api::Key;
    use serde_json::json;

    fn response(n: i64) -> GetRowsResponse {
        GetRowsResponse::new(vec![json!({ "id": n })], 1)
    }

    /// Keys everything by page index only.
    #[derive(Default)]
    struct PageCache {
        inner: MemoryCache,
    }

    impl ResponseCache for PageCache {
        fn derive_key(&self, params: &GetRowsParams) -> Result<CacheKey, CacheError> {
            Ok(CacheKey(format!("page-{}", params.pagination_model.page)))
        }
        fn get(&self, key: &CacheKey) -> Option<GetRowsResponse> {
            self.inner.get(key)
        }
        fn set(&self, key: CacheKey, response: GetRowsResponse) {
            self.inner.set(key, response)
        }
        fn clear(&self) {
            self.inner.clear()
        }
    }

    struct BrokenCache;

    impl ResponseCache for BrokenCache {
        fn derive_key(&self, _params: &GetRowsParams) -> Result<CacheKey, CacheError> {
            Err(CacheError::KeyDerivation("no keys here".into()))
        }
        fn get(&self, _key: &CacheKey) -> Option<GetRowsResponse> {
            None
        }
        fn set(&self, _key: CacheKey, _response: GetRowsResponse) {}
        fn clear(&self) {}
    }

    #[test]
    fn test_round_trip_through_slot() {
        let slot = CacheSlot::default();
        let params = GetRowsParams::default();

        slot.set_cache_data(&params, response(1)).unwrap();
        assert_eq!(slot.get_cache_data(&params).unwrap(), Some(response(1)));

        slot.set_cache_data(&params, response(2)).unwrap();
        assert_eq!(slot.get_cache_data(&params).unwrap(), Some(response(2)));

        slot.clear_cache();
        assert_eq!(slot.get_cache_data(&params).unwrap(), None);
    }

    #[test]
    fn test_disabled_is_noop() {
        let slot = CacheSlot::default();
        slot.set_disabled(true);
        let params = GetRowsParams::default();

        slot.set_cache_data(&params, response(1)).unwrap();
        assert_eq!(slot.get_cache_data(&params).unwrap(), None);
        assert!(slot.default_cache().is_empty());
        assert_eq!(slot.handle().key_for(&params).unwrap(), None);
    }

    #[test]
    fn test_disabled_clear_keeps_entries() {
        let slot = CacheSlot::default();
        let params = GetRowsParams::default();
        slot.set_cache_data(&params, response(1)).unwrap();

        slot.set_disabled(true);
        slot.clear_cache();
        slot.set_disabled(false);

        assert_eq!(slot.get_cache_data(&params).unwrap(), Some(response(1)));
    }

    #[test]
    fn test_disabling_affects_existing_handles() {
        let slot = CacheSlot::default();
        let handle = slot.handle();
        slot.set_disabled(true);
        handle.set(CacheKey::from("k"), response(1));
        assert!(slot.default_cache().is_empty());
    }

    #[test]
    fn test_override_uses_host_key() {
        let slot = CacheSlot::default();
        let host: Arc<dyn ResponseCache> = Arc::new(PageCache::default());
        slot.replace(Some(host));
        assert!(slot.is_overridden());

        let params = GetRowsParams::default();
        slot.set_cache_data(&params, response(1)).unwrap();

        // Group keys are ignored by the host key, so this is a hit
        let child = params.with_group_keys(vec![Key::from("x")]);
        assert_eq!(slot.get_cache_data(&child).unwrap(), Some(response(1)));
        assert!(slot.default_cache().is_empty());
    }

    #[test]
    fn test_handles_keep_their_instance() {
        let slot = CacheSlot::default();
        let before = slot.handle();

        let host: Arc<dyn ResponseCache> = Arc::new(PageCache::default());
        slot.replace(Some(host));
        let after = slot.handle();
        assert!(!before.same_instance(&after));

        before.set(CacheKey::from("k"), response(1));
        assert_eq!(slot.default_cache().len(), 1);

        slot.replace(None);
        assert!(!slot.is_overridden());
        assert!(before.same_instance(&slot.handle()));
    }

    #[test]
    fn test_key_derivation_error_propagates() {
        let slot = CacheSlot::default();
        let host: Arc<dyn ResponseCache> = Arc::new(BrokenCache);
        slot.replace(Some(host));
        let err = slot.get_cache_data(&GetRowsParams::default()).unwrap_err();
        assert!(matches!(err, CacheError::KeyDerivation(_)));
    }
}
