//! Issued fetches and the children fetch queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;
use rowsource_api::{FetchId, FetchTarget, GetRowsParams, RowId};
use rowsource_cache::{CacheHandle, CacheKey};

/// Counter for generating unique fetch IDs.
static FETCH_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique fetch ID.
pub fn next_fetch_id() -> FetchId {
    FetchId(FETCH_ID_COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// Everything a fetch captured when it was issued.
///
/// At resolution the snapshot is compared to the parameters current at that
/// moment; only a match may touch the cache or the row state.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub id: FetchId,
    pub target: FetchTarget,
    pub params: GetRowsParams,

    /// The cache current when the fetch started.
    pub cache: CacheHandle,

    /// Key derived at issue time; `None` when caching was disabled.
    pub cache_key: Option<CacheKey>,
}

impl FetchTicket {
    pub fn new(
        target: FetchTarget,
        params: GetRowsParams,
        cache: CacheHandle,
        cache_key: Option<CacheKey>,
    ) -> Self {
        Self {
            id: next_fetch_id(),
            target,
            params,
            cache,
            cache_key,
        }
    }
}

/// A children fetch that has been handed to the host.
#[derive(Debug, Clone)]
struct Pending {
    fetch_id: FetchId,
    params: GetRowsParams,
}

/// Children fetch bookkeeping: rows waiting for a slot and rows in flight.
#[derive(Debug)]
pub struct ChildrenQueue {
    /// Rows waiting to be dispatched, oldest first.
    queued: IndexSet<RowId>,

    /// Latest fetch handed out per row.
    pending: HashMap<RowId, Pending>,

    /// Children fetches still running, stale ones included.
    active: usize,

    /// `None` is unbounded.
    max_concurrent: Option<usize>,
}

impl ChildrenQueue {
    pub fn new(max_concurrent: Option<usize>) -> Self {
        Self {
            queued: IndexSet::new(),
            pending: HashMap::new(),
            active: 0,
            // A limit of zero would never dispatch anything
            max_concurrent: max_concurrent.map(|n| n.max(1)),
        }
    }

    /// Whether `id` is in flight with exactly these parameters.
    pub fn is_pending_with(&self, id: &RowId, params: &GetRowsParams) -> bool {
        self.pending
            .get(id)
            .is_some_and(|pending| &pending.params == params)
    }

    pub fn is_pending(&self, id: &RowId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn is_queued(&self, id: &RowId) -> bool {
        self.queued.contains(id)
    }

    /// Add a row to the back of the queue. Returns false if already queued.
    pub fn enqueue(&mut self, id: RowId) -> bool {
        self.queued.insert(id)
    }

    /// Take the next row if a slot is free.
    pub fn next_ready(&mut self) -> Option<RowId> {
        if let Some(max) = self.max_concurrent {
            if self.active >= max {
                return None;
            }
        }
        self.queued.shift_remove_index(0)
    }

    /// Record that a fetch for `id` was handed to the host.
    pub fn start(&mut self, id: RowId, fetch_id: FetchId, params: GetRowsParams) {
        self.active += 1;
        self.pending.insert(id, Pending { fetch_id, params });
    }

    /// Record that `fetch_id` resolved, freeing its slot.
    ///
    /// The row's pending entry is dropped only if it still belongs to this
    /// fetch; a newer fetch for the same row keeps its entry.
    pub fn finish(&mut self, id: &RowId, fetch_id: FetchId) {
        self.active = self.active.saturating_sub(1);
        if self
            .pending
            .get(id)
            .is_some_and(|pending| pending.fetch_id == fetch_id)
        {
            self.pending.remove(id);
        }
    }

    /// Forget rows that left the data set.
    pub fn remove_rows(&mut self, ids: &[RowId]) {
        for id in ids {
            self.queued.shift_remove(id);
            self.pending.remove(id);
        }
    }

    /// Drop queued rows and pending entries. Fetches already running keep
    /// their slots until they resolve.
    pub fn clear(&mut self) {
        self.queued.clear();
        self.pending.clear();
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowsource_api::{Key, PaginationModel};

    fn params(page: u32) -> GetRowsParams {
        GetRowsParams {
            pagination_model: PaginationModel { page, page_size: 10 },
            ..Default::default()
        }
    }

    #[test]
    fn test_fetch_ids_increase() {
        let a = next_fetch_id();
        let b = next_fetch_id();
        assert!(b > a);
    }

    #[test]
    fn test_enqueue_is_idempotent() {
        let mut queue = ChildrenQueue::new(None);
        assert!(queue.enqueue(Key::Int(1)));
        assert!(!queue.enqueue(Key::Int(1)));
        assert_eq!(queue.queued_len(), 1);
    }

    #[test]
    fn test_concurrency_limit() {
        let mut queue = ChildrenQueue::new(Some(1));
        queue.enqueue(Key::Int(1));
        queue.enqueue(Key::Int(2));

        let first = queue.next_ready().unwrap();
        assert_eq!(first, Key::Int(1));
        let fetch_id = next_fetch_id();
        queue.start(first.clone(), fetch_id, params(0));

        assert_eq!(queue.next_ready(), None);

        queue.finish(&first, fetch_id);
        assert_eq!(queue.next_ready(), Some(Key::Int(2)));
    }

    #[test]
    fn test_zero_limit_still_dispatches() {
        let mut queue = ChildrenQueue::new(Some(0));
        queue.enqueue(Key::Int(1));
        assert_eq!(queue.next_ready(), Some(Key::Int(1)));
    }

    #[test]
    fn test_finish_keeps_newer_pending_entry() {
        let mut queue = ChildrenQueue::new(None);
        let id = Key::Int(1);
        let old = next_fetch_id();
        let new = next_fetch_id();

        queue.start(id.clone(), old, params(0));
        queue.start(id.clone(), new, params(1));
        assert!(queue.is_pending_with(&id, &params(1)));
        assert!(!queue.is_pending_with(&id, &params(0)));

        queue.finish(&id, old);
        assert!(queue.is_pending(&id));
        assert_eq!(queue.active(), 1);

        queue.finish(&id, new);
        assert!(!queue.is_pending(&id));
        assert_eq!(queue.active(), 0);
    }

    #[test]
    fn test_clear_keeps_active_slots() {
        let mut queue = ChildrenQueue::new(Some(1));
        let fetch_id = next_fetch_id();
        queue.start(Key::Int(1), fetch_id, params(0));
        queue.enqueue(Key::Int(2));

        queue.clear();
        assert_eq!(queue.queued_len(), 0);
        assert!(!queue.is_pending(&Key::Int(1)));
        assert_eq!(queue.active(), 1);

        queue.finish(&Key::Int(1), fetch_id);
        assert_eq!(queue.active(), 0);
    }
}
