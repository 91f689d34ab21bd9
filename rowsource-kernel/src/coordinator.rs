//! Fetch coordinator - issues fetches, consults the cache and applies results.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rowsource_api::{
    DataSourceEvent, FetchId, FetchTarget, FilterModel, GetRowsParams, GetRowsResponse, PaginationModel,
    RowId, SortModel,
};
use rowsource_cache::{CacheSlot, MemoryCache, ResponseCache};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::fetch::{ChildrenQueue, FetchTicket};
use crate::state::RowFetchState;
use crate::{DataSource, DataSourceConfig, DataSourceError, DataSourceState, FetchError, RowTree};

/// Everything mutated by fetch resolutions.
struct Shared {
    /// Current request parameters; `group_keys` is always empty here.
    params: GetRowsParams,
    tree: RowTree,
    state: DataSourceState,
    queue: ChildrenQueue,
    /// The most recently issued top-level fetch.
    root_fetch: Option<FetchId>,
}

impl Shared {
    /// The parameters a fetch for `target` would be issued with right now.
    /// `None` if the target row is no longer loaded.
    fn current_params(&self, target: &FetchTarget) -> Option<GetRowsParams> {
        match target {
            FetchTarget::TopLevel => Some(self.params.clone()),
            FetchTarget::Children(id) => self
                .tree
                .group_keys_for(id)
                .map(|keys| self.params.with_group_keys(keys)),
        }
    }

    fn is_relevant(&self, ticket: &FetchTicket) -> bool {
        self.current_params(&ticket.target)
            .is_some_and(|params| params == ticket.params)
    }
}

struct Inner {
    source: Arc<dyn DataSource>,
    config: DataSourceConfig,
    cache: CacheSlot,
    shared: Mutex<Shared>,
    event_tx: broadcast::Sender<DataSourceEvent>,
    /// Spawned fetch tasks, for `settle`.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Coordinates `getRows` requests for the top level and for group children.
///
/// Handles are cheap to clone and share one state. Operations that issue
/// fetches must run inside a tokio runtime; the fetches themselves run as
/// tasks and report back through [`DataSourceEvent`]s and the read surface
/// (`is_children_loading`, `children_fetch_error`, ...).
///
/// Each fetch snapshots its parameters when issued. When it resolves, the
/// result is applied only if the snapshot still equals the parameters that
/// would be used now; otherwise it is discarded without touching the cache,
/// the rows or the errors. A discarded fetch only clears its loading flag, and
/// only when no newer fetch for the same target is in flight.
#[derive(Clone)]
pub struct FetchCoordinator {
    inner: Arc<Inner>,
}

impl FetchCoordinator {
    /// Create a coordinator serving rows from `source`.
    pub fn new(
        source: Arc<dyn DataSource>,
        config: DataSourceConfig,
    ) -> (Self, broadcast::Receiver<DataSourceEvent>) {
        let (event_tx, event_rx) = broadcast::channel(config.event_capacity.max(1));

        let cache = CacheSlot::new(MemoryCache::with_ttl(config.cache_ttl()));
        cache.set_disabled(config.disable_cache);

        let shared = Shared {
            params: GetRowsParams::default(),
            tree: RowTree::new(),
            state: DataSourceState::new(),
            queue: ChildrenQueue::new(config.max_concurrent_requests),
            root_fetch: None,
        };

        let coordinator = Self {
            inner: Arc::new(Inner {
                source,
                config,
                cache,
                shared: Mutex::new(shared),
                event_tx,
                tasks: Mutex::new(Vec::new()),
            }),
        };
        (coordinator, event_rx)
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.inner
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to data source events.
    pub fn subscribe(&self) -> broadcast::Receiver<DataSourceEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Emit an event. Having no subscribers is fine.
    fn emit(&self, event: DataSourceEvent) {
        let _ = self.inner.event_tx.send(event);
    }

    pub fn config(&self) -> &DataSourceConfig {
        &self.inner.config
    }

    // ---------------------------------------------------------------------
    // Fetching
    // ---------------------------------------------------------------------

    /// Fetch (or refetch) the top-level rows with the current parameters.
    ///
    /// A cached response for the current parameters is applied without
    /// calling the host. Call [`clear_cache`](Self::clear_cache) first to
    /// force a fresh request.
    ///
    /// Fire-and-forget: a failing fetch is recorded as the root error. Only
    /// configuration defects (cache key derivation, missing runtime) are
    /// returned.
    pub fn fetch_top_level_rows(&self) -> Result<(), DataSourceError> {
        let runtime = Handle::try_current().map_err(|_| DataSourceError::NoRuntime)?;
        let target = FetchTarget::TopLevel;
        let params = self.shared().params.clone();

        let cache = self.inner.cache.handle();
        let cache_key = cache.key_for(&params)?;

        if let Some(response) = cache_key.as_ref().and_then(|key| cache.get(key)) {
            tracing::debug!("top-level rows served from cache");
            let expand = {
                let mut shared = self.shared();
                if shared.params != params {
                    return Ok(());
                }
                self.apply_rows(&mut shared, &target, response, true)
            };
            return self.queue_expansions(expand);
        }

        let ticket = FetchTicket::new(target, params, cache, cache_key);
        {
            let mut shared = self.shared();
            shared.root_fetch = Some(ticket.id);
            shared.state.set_root_loading(true);
        }
        self.spawn(&runtime, ticket);
        Ok(())
    }

    /// Ask for the children of a group row.
    ///
    /// Calling this again while a fetch for the same row and the same
    /// parameters is pending or queued does nothing. If the parameters changed
    /// since, a new fetch is issued and the older one will be discarded when
    /// it resolves.
    pub fn queue_children_fetch(&self, id: &RowId) -> Result<(), DataSourceError> {
        {
            let mut shared = self.shared();
            let Some(params) = shared.current_params(&FetchTarget::Children(id.clone())) else {
                tracing::debug!(%id, "not queueing children fetch for unknown row");
                return Ok(());
            };
            if shared.queue.is_pending_with(id, &params) || shared.queue.is_queued(id) {
                tracing::debug!(%id, "children fetch already pending");
                return Ok(());
            }
            shared.queue.enqueue(id.clone());
        }
        self.dispatch_queued()
    }

    /// Start queued children fetches while slots are free.
    fn dispatch_queued(&self) -> Result<(), DataSourceError> {
        loop {
            let next = self.shared().queue.next_ready();
            let Some(id) = next else {
                return Ok(());
            };
            self.fetch_row_children(&id)?;
        }
    }

    /// Fetch the children of `id` now: cache check, then the host.
    ///
    /// Bypasses the queue and its concurrency limit. Rows that are unknown or
    /// have no children are ignored.
    pub fn fetch_row_children(&self, id: &RowId) -> Result<(), DataSourceError> {
        let runtime = Handle::try_current().map_err(|_| DataSourceError::NoRuntime)?;
        let target = FetchTarget::Children(id.clone());

        let params = {
            let shared = self.shared();
            match shared.tree.node(id) {
                Some(node) if node.has_children => shared.params.with_group_keys(node.path.clone()),
                Some(_) => {
                    tracing::debug!(%id, "row has no children to fetch");
                    return Ok(());
                }
                None => {
                    tracing::debug!(%id, "cannot fetch children of unknown row");
                    return Ok(());
                }
            }
        };

        let cache = self.inner.cache.handle();
        let cache_key = cache.key_for(&params)?;

        if let Some(response) = cache_key.as_ref().and_then(|key| cache.get(key)) {
            tracing::debug!(%id, "children served from cache");
            let expand = {
                let mut shared = self.shared();
                if shared.current_params(&target).as_ref() != Some(&params) {
                    return Ok(());
                }
                self.apply_rows(&mut shared, &target, response, true)
            };
            return self.queue_expansions(expand);
        }

        let ticket = FetchTicket::new(target, params, cache, cache_key);
        {
            let mut shared = self.shared();
            shared.queue.start(id.clone(), ticket.id, ticket.params.clone());
            shared.state.set_loading(id, true);
        }
        self.spawn(&runtime, ticket);
        Ok(())
    }

    fn spawn(&self, runtime: &Handle, ticket: FetchTicket) {
        tracing::debug!(fetch_id = ticket.id.0, fetch_target = ?ticket.target, "fetch started");
        self.emit(DataSourceEvent::FetchStarted {
            fetch_id: ticket.id,
            target: ticket.target.clone(),
            params: ticket.params.clone(),
        });

        let this = self.clone();
        let source = self.inner.source.clone();
        let params = ticket.params.clone();
        let task = runtime.spawn(async move {
            // The host call runs in its own task so a panic still resolves the ticket
            let result = match tokio::spawn(async move { source.get_rows(params).await }).await {
                Ok(result) => result,
                Err(e) => match e.try_into_panic() {
                    Ok(payload) => Err(anyhow::anyhow!(
                        "getRows panicked: {}",
                        panic_message(payload.as_ref())
                    )),
                    Err(e) => Err(anyhow::anyhow!("getRows task failed: {}", e)),
                },
            };
            this.resolve(ticket, result);
        });

        let mut tasks = self.tasks();
        tasks.retain(|task| !task.is_finished());
        tasks.push(task);
    }

    /// Apply (or discard) a finished fetch.
    fn resolve(&self, ticket: FetchTicket, result: anyhow::Result<GetRowsResponse>) {
        let expand = {
            let mut shared = self.shared();
            if let FetchTarget::Children(id) = &ticket.target {
                shared.queue.finish(id, ticket.id);
            }

            if !shared.is_relevant(&ticket) {
                tracing::trace!(fetch_id = ticket.id.0, fetch_target = ?ticket.target, "discarding stale fetch");
                // Clear the loading flag unless a newer fetch for the target is in flight
                match &ticket.target {
                    FetchTarget::TopLevel => {
                        if shared.root_fetch == Some(ticket.id) {
                            shared.root_fetch = None;
                            shared.state.set_root_loading(false);
                        }
                    }
                    FetchTarget::Children(id) => {
                        if !shared.queue.is_pending(id) {
                            shared.state.set_loading(id, false);
                        }
                    }
                }
                self.emit(DataSourceEvent::FetchDiscarded {
                    fetch_id: ticket.id,
                    target: ticket.target.clone(),
                });
                Vec::new()
            } else {
                match result {
                    Ok(response) => {
                        if let Some(key) = ticket.cache_key.clone() {
                            ticket.cache.set(key, response.clone());
                        }
                        self.apply_rows(&mut shared, &ticket.target, response, false)
                    }
                    Err(error) => {
                        self.record_failure(&mut shared, &ticket, FetchError::new(error));
                        Vec::new()
                    }
                }
            }
        };

        if let Err(e) = self.queue_expansions(expand) {
            tracing::warn!("failed to expand loaded groups: {}", e);
        }
        if let Err(e) = self.dispatch_queued() {
            tracing::warn!("failed to dispatch queued children fetch: {}", e);
        }
    }

    /// Merge a successful response. Returns the new group rows that should
    /// be expanded right away.
    fn apply_rows(
        &self,
        shared: &mut Shared,
        target: &FetchTarget,
        response: GetRowsResponse,
        from_cache: bool,
    ) -> Vec<RowId> {
        let row_count = response.row_count;
        let source = self.inner.source.as_ref();

        let (removed, loaded) = match target {
            FetchTarget::TopLevel => {
                let removed = shared.tree.replace_top_level(response, source);
                shared.state.set_root_loading(false);
                shared.state.set_root_error(None);
                (removed, shared.tree.top_level().to_vec())
            }
            FetchTarget::Children(id) => {
                let removed = shared.tree.set_children(id, response.rows, source);
                shared.state.set_loading(id, false);
                shared.state.set_error(id, None);
                (removed, shared.tree.children(id).to_vec())
            }
        };

        shared.state.remove_rows(&removed);
        shared.queue.remove_rows(&removed);

        self.emit(DataSourceEvent::RowsLoaded {
            target: target.clone(),
            from_cache,
            row_count,
        });

        let config = &self.inner.config;
        loaded
            .into_iter()
            .filter(|id| {
                shared.tree.node(id).is_some_and(|node| {
                    node.has_children && !node.children_fetched && config.expands_depth(node.depth)
                })
            })
            .collect()
    }

    fn record_failure(&self, shared: &mut Shared, ticket: &FetchTicket, error: FetchError) {
        tracing::warn!(fetch_target = ?ticket.target, "fetch failed: {}", error);
        let message = error.message();

        match &ticket.target {
            FetchTarget::TopLevel => {
                shared.state.set_root_loading(false);
                shared.state.set_root_error(Some(error));
            }
            FetchTarget::Children(id) => {
                shared.state.set_loading(id, false);
                shared.state.set_error(id, Some(error));
            }
        }

        self.emit(DataSourceEvent::FetchFailed {
            target: ticket.target.clone(),
            params: ticket.params.clone(),
            message,
        });
    }

    fn queue_expansions(&self, ids: Vec<RowId>) -> Result<(), DataSourceError> {
        for id in ids {
            self.queue_children_fetch(&id)?;
        }
        Ok(())
    }

    /// Wait until every fetch issued so far, and every fetch those trigger,
    /// has resolved.
    pub async fn settle(&self) {
        loop {
            let tasks = std::mem::take(&mut *self.tasks());
            if tasks.is_empty() {
                return;
            }
            for task in tasks {
                if let Err(e) = task.await {
                    tracing::warn!("fetch task failed: {}", e);
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // State mutators
    // ---------------------------------------------------------------------

    /// Set the loading flag of a group row's children.
    pub fn set_children_loading(&self, id: &RowId, loading: bool) {
        self.shared().state.set_loading(id, loading);
    }

    /// Record (or clear, with `None`) the error of a group row's children.
    pub fn set_children_fetch_error(&self, id: &RowId, error: Option<FetchError>) {
        self.shared().state.set_error(id, error);
    }

    /// Clear every per-row loading and error flag and forget queued and
    /// pending children fetches. The response cache is left alone.
    pub fn reset_data_source_state(&self) {
        {
            let mut shared = self.shared();
            shared.state.clear();
            shared.queue.clear();
        }
        self.emit(DataSourceEvent::StateReset);
    }

    // ---------------------------------------------------------------------
    // Request parameters
    // ---------------------------------------------------------------------

    /// The current request parameters (top level).
    pub fn params(&self) -> GetRowsParams {
        self.shared().params.clone()
    }

    /// Replace the request parameters, reset per-row state and refetch the
    /// top level. Fetches issued with the previous parameters go stale.
    pub fn set_params(&self, params: GetRowsParams) -> Result<(), DataSourceError> {
        let params = params.with_group_keys(Vec::new());
        {
            let mut shared = self.shared();
            if shared.params == params {
                return Ok(());
            }
            shared.params = params;
            shared.state.clear();
            shared.queue.clear();
        }
        self.emit(DataSourceEvent::StateReset);
        self.fetch_top_level_rows()
    }

    pub fn set_pagination_model(&self, pagination_model: PaginationModel) -> Result<(), DataSourceError> {
        let mut params = self.params();
        params.pagination_model = pagination_model;
        self.set_params(params)
    }

    pub fn set_filter_model(&self, filter_model: FilterModel) -> Result<(), DataSourceError> {
        let mut params = self.params();
        params.filter_model = filter_model;
        self.set_params(params)
    }

    pub fn set_sort_model(&self, sort_model: SortModel) -> Result<(), DataSourceError> {
        let mut params = self.params();
        params.sort_model = sort_model;
        self.set_params(params)
    }

    // ---------------------------------------------------------------------
    // Expansion
    // ---------------------------------------------------------------------

    /// Expand or collapse a group row. Expanding a group whose children were
    /// never loaded queues their fetch; the row shows as expanded once they
    /// arrive.
    pub fn set_row_children_expansion(&self, id: &RowId, expanded: bool) -> Result<(), DataSourceError> {
        let needs_fetch = {
            let mut shared = self.shared();
            let needs_fetch = match shared.tree.node(id) {
                Some(node) => expanded && node.has_children && !node.children_fetched,
                None => return Ok(()),
            };
            if !needs_fetch {
                shared.tree.set_expanded(id, expanded);
            }
            needs_fetch
        };

        if needs_fetch {
            self.queue_children_fetch(id)?;
        }
        Ok(())
    }

    /// Grouping-cell click: a collapsed group always requests its children
    /// (from the cache when possible); an expanded one collapses.
    pub fn toggle_row_expansion(&self, id: &RowId) -> Result<(), DataSourceError> {
        let expanded = match self.shared().tree.node(id) {
            Some(node) => node.expanded,
            None => return Ok(()),
        };

        if expanded {
            self.set_row_children_expansion(id, false)
        } else {
            self.queue_children_fetch(id)
        }
    }

    // ---------------------------------------------------------------------
    // Cache
    // ---------------------------------------------------------------------

    /// Look up the cached response for `params`.
    pub fn get_cache_data(&self, params: &GetRowsParams) -> Result<Option<GetRowsResponse>, DataSourceError> {
        Ok(self.inner.cache.get_cache_data(params)?)
    }

    /// Store a response for `params`.
    pub fn set_cache_data(&self, params: &GetRowsParams, response: GetRowsResponse) -> Result<(), DataSourceError> {
        Ok(self.inner.cache.set_cache_data(params, response)?)
    }

    /// Clear the current cache. Row state is left alone.
    pub fn clear_cache(&self) {
        self.inner.cache.clear_cache();
        self.emit(DataSourceEvent::CacheCleared);
    }

    /// Swap in a host cache, or restore the built-in one with `None`.
    /// Fetches already in flight keep writing to the cache they started with.
    pub fn set_cache(&self, cache: Option<Arc<dyn ResponseCache>>) {
        self.inner.cache.replace(cache);
    }

    pub fn set_cache_disabled(&self, disabled: bool) {
        self.inner.cache.set_disabled(disabled);
    }

    pub fn cache(&self) -> &CacheSlot {
        &self.inner.cache
    }

    // ---------------------------------------------------------------------
    // Read surface
    // ---------------------------------------------------------------------

    pub fn is_children_loading(&self, id: &RowId) -> bool {
        self.shared().state.is_loading(id)
    }

    pub fn children_fetch_error(&self, id: &RowId) -> Option<FetchError> {
        self.shared().state.error(id).cloned()
    }

    pub fn children_fetch_state(&self, id: &RowId) -> RowFetchState {
        self.shared().state.fetch_state(id)
    }

    pub fn is_root_loading(&self) -> bool {
        self.shared().state.is_root_loading()
    }

    pub fn root_error(&self) -> Option<FetchError> {
        self.shared().state.root_error().cloned()
    }

    /// Top-level row count reported by the server (`-1` if unknown).
    pub fn row_count(&self) -> i64 {
        self.shared().tree.row_count()
    }

    /// Run `f` against the loaded rows.
    pub fn with_tree<R>(&self, f: impl FnOnce(&RowTree) -> R) -> R {
        f(&self.shared().tree)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown error"
    }
}
