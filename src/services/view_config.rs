//! Live configuration of a named view and its debounced persistence.
//!
//! The store starts from defaults with `loaded == false` and issues a single
//! load through [`ViewConfigStore::hydrate`]. Until that load resolves no
//! save is ever scheduled, so defaults can never overwrite a persisted
//! configuration that has not been fetched yet.
//!
//! Once loaded, every committed change to filters or sort replaces the
//! payload of a single pending write slot and restarts one timer. Only the
//! payload present when the timer fires is written, so a burst of edits
//! produces one write. Writes are serialized per store: a write takes the
//! pending payload only after the previous write has finished, so an older
//! payload can never land after a newer one. The search query is never
//! persisted.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::errors::ViewError;
use crate::models::view::{
    FilterConfig, ProductionFilterConfig, SortConfig, SortCriterion, ViewConfig, ViewFilters,
    ViewName,
};
use crate::storage::ViewStateBackend;

pub type OrderViewStore = ViewConfigStore<FilterConfig>;
pub type ProductionViewStore = ViewConfigStore<ProductionFilterConfig>;

struct StoreState<F> {
    config: ViewConfig<F>,
    pending: Option<Value>,
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

/// Cloneable handle onto one view's configuration.
pub struct ViewConfigStore<F: ViewFilters> {
    view: ViewName,
    key: String,
    backend: Arc<dyn ViewStateBackend>,
    debounce: Duration,
    state: Arc<Mutex<StoreState<F>>>,
    load: Arc<OnceCell<()>>,
    write_guard: Arc<AsyncMutex<()>>,
}

impl<F: ViewFilters> Clone for ViewConfigStore<F> {
    fn clone(&self) -> Self {
        Self {
            view: self.view,
            key: self.key.clone(),
            backend: Arc::clone(&self.backend),
            debounce: self.debounce,
            state: Arc::clone(&self.state),
            load: Arc::clone(&self.load),
            write_guard: Arc::clone(&self.write_guard),
        }
    }
}

impl<F: ViewFilters> ViewConfigStore<F> {
    pub fn new(view: ViewName, backend: Arc<dyn ViewStateBackend>, config: &EngineConfig) -> Self {
        Self {
            view,
            key: config.storage_key(view),
            backend,
            debounce: config.save_debounce(),
            state: Arc::new(Mutex::new(StoreState {
                config: ViewConfig::default(),
                pending: None,
                timer: None,
                generation: 0,
            })),
            load: Arc::new(OnceCell::new()),
            write_guard: Arc::new(AsyncMutex::new(())),
        }
    }

    pub fn view(&self) -> ViewName {
        self.view
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    fn lock(&self) -> MutexGuard<'_, StoreState<F>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Reconciles persisted state into the live configuration.
    ///
    /// Only one load ever completes. Concurrent callers wait for the load in
    /// flight and later calls return immediately. If the future running the
    /// load is dropped before it resolves, the next call issues it again. A
    /// missing document keeps the defaults, a read failure is logged and
    /// keeps them too. In every case the store is marked loaded afterwards.
    #[instrument(skip(self), fields(view = %self.view))]
    pub async fn hydrate(&self) {
        if self.load.initialized() {
            debug!("persisted configuration already loaded");
            return;
        }
        self.load.get_or_init(|| self.load_persisted()).await;
    }

    async fn load_persisted(&self) {
        let result = self.backend.get(&self.key).await;

        let mut state = self.lock();
        match result {
            Ok(Some(document)) => {
                let fallbacks = state.config.apply_persisted(&document);
                if fallbacks.is_empty() {
                    info!("persisted view configuration loaded");
                } else {
                    warn!(fields = ?fallbacks, "persisted view configuration partially invalid; using defaults for these fields");
                }
            }
            Ok(None) => info!("no persisted view configuration; keeping defaults"),
            Err(err) => warn!(error = %err, "failed to load view configuration; keeping defaults"),
        }
        state.config.loaded = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().config.loaded
    }

    /// Copy of the live configuration.
    pub fn snapshot(&self) -> ViewConfig<F> {
        self.lock().config.clone()
    }

    pub fn search_query(&self) -> String {
        self.lock().config.search_query.clone()
    }

    pub fn filters(&self) -> F {
        self.lock().config.filters.clone()
    }

    pub fn sort(&self) -> SortConfig {
        self.lock().config.sort.clone()
    }

    /// Updates the search text. Never persisted.
    pub fn set_search_query(&self, query: impl Into<String>) {
        self.lock().config.search_query = query.into();
    }

    pub fn update_filters(&self, edit: impl FnOnce(&mut F)) {
        let mut state = self.lock();
        edit(&mut state.config.filters);
        self.commit(&mut state);
    }

    pub fn set_filters(&self, filters: F) {
        self.update_filters(|current| *current = filters);
    }

    pub fn update_sort(&self, edit: impl FnOnce(&mut SortConfig)) {
        let mut state = self.lock();
        edit(&mut state.config.sort);
        self.commit(&mut state);
    }

    /// Moves one fabrication priority entry. A rejected move leaves the
    /// configuration untouched and schedules nothing.
    pub fn reorder_priority(&self, from: usize, to: usize) -> Result<(), ViewError> {
        let mut state = self.lock();
        state.config.sort.fabrication_priority.reorder(from, to)?;
        self.commit(&mut state);
        Ok(())
    }

    pub fn set_criteria(&self, criteria: Vec<SortCriterion>) {
        self.update_sort(|sort| sort.criteria = criteria);
    }

    /// Restores default filters, sort and search.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.config.search_query.clear();
        state.config.filters = F::default();
        state.config.sort = SortConfig::default();
        self.commit(&mut state);
    }

    /// Payload waiting for the debounce timer, if any.
    pub fn pending_save(&self) -> Option<Value> {
        self.lock().pending.clone()
    }

    /// Writes the pending payload now instead of waiting for the timer.
    /// Waits for a write already in flight first. Returns whether anything
    /// was written.
    #[instrument(skip(self), fields(view = %self.view))]
    pub async fn flush(&self) -> Result<bool, ViewError> {
        let _write = self.write_guard.lock().await;
        let payload = {
            let mut state = self.lock();
            state.generation += 1;
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.pending.take()
        };

        match payload {
            Some(payload) => {
                self.backend.set(&self.key, &payload).await?;
                debug!("view configuration flushed");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn commit(&self, state: &mut StoreState<F>) {
        if !state.config.loaded {
            debug!(view = %self.view, "save suppressed until persisted configuration is loaded");
            return;
        }

        let payload = match state.config.to_persisted() {
            Ok(payload) => payload,
            Err(err) => {
                warn!(view = %self.view, error = %err, "failed to serialize view configuration");
                return;
            }
        };

        state.pending = Some(payload);
        state.generation += 1;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }

        let generation = state.generation;
        let store = self.clone();
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(store.debounce).await;
            store.write_pending(generation).await;
        }));
        debug!(view = %self.view, generation, "save scheduled");
    }

    async fn write_pending(&self, generation: u64) {
        let _write = self.write_guard.lock().await;
        let payload = {
            let mut state = self.lock();
            if state.generation != generation {
                return;
            }
            state.timer = None;
            state.pending.take()
        };
        let Some(payload) = payload else {
            return;
        };

        match self.backend.set(&self.key, &payload).await {
            Ok(()) => debug!(view = %self.view, "view configuration saved"),
            Err(err) => warn!(view = %self.view, error = %err, "failed to save view configuration"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::states::FabricationState;
    use crate::models::view::{SortDirection, SortField};
    use crate::storage::InMemoryViewState;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn store(backend: &InMemoryViewState) -> OrderViewStore {
        ViewConfigStore::new(
            ViewName::Pedidos,
            Arc::new(backend.clone()),
            &EngineConfig::default(),
        )
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn edits_before_load_are_not_saved() {
        let backend = InMemoryViewState::new();
        let store = store(&backend);

        store.update_filters(|filters| {
            filters.toggle_fabrication(FabricationState::Hecho);
        });
        assert!(store.pending_save().is_none());
        advance(1000).await;
        assert!(backend.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_document_keeps_defaults_and_marks_loaded() {
        let backend = InMemoryViewState::new();
        let store = store(&backend);
        assert!(!store.is_loaded());

        store.hydrate().await;
        assert!(store.is_loaded());
        assert_eq!(store.sort(), SortConfig::default());
    }

    #[tokio::test(start_paused = true)]
    async fn load_overwrites_filters_and_sort_once() {
        let backend = InMemoryViewState::new();
        backend
            .set(
                "view-config:pedidos",
                &json!({
                    "filters": { "fabrication": ["HECHO"] },
                    "sort": { "criteria": [{ "field": "cliente", "dir": "asc" }] }
                }),
            )
            .await
            .unwrap();
        let store = store(&backend);
        store.set_search_query("ana");

        store.hydrate().await;
        let config = store.snapshot();
        assert!(config.filters.fabrication.contains(&FabricationState::Hecho));
        assert_eq!(config.sort.criteria[0].field, SortField::Customer);
        assert_eq!(config.search_query, "ana");

        backend.delete("view-config:pedidos").await.unwrap();
        store.hydrate().await;
        assert!(store.filters().fabrication.contains(&FabricationState::Hecho));
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_writes_only_the_last_state() {
        let backend = InMemoryViewState::new();
        let store = store(&backend);
        store.hydrate().await;

        store.reorder_priority(0, 1).unwrap();
        advance(100).await;
        store.reorder_priority(1, 2).unwrap();
        advance(100).await;
        store.reorder_priority(2, 3).unwrap();
        advance(499).await;
        assert!(backend.is_empty());

        advance(2).await;
        assert!(store.pending_save().is_none());
        let saved = backend.get("view-config:pedidos").await.unwrap().unwrap();
        let (restored, fallbacks) = ViewConfig::<FilterConfig>::from_persisted(&saved);
        assert!(fallbacks.is_empty());
        assert_eq!(restored.sort, store.sort());
    }

    #[tokio::test(start_paused = true)]
    async fn search_query_is_never_persisted() {
        let backend = InMemoryViewState::new();
        let store = store(&backend);
        store.hydrate().await;

        store.set_search_query("monograma");
        assert!(store.pending_save().is_none());
        assert!(!store.flush().await.unwrap());
        assert!(backend.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_reorder_changes_nothing() {
        let backend = InMemoryViewState::new();
        let store = store(&backend);
        store.hydrate().await;

        assert_matches!(
            store.reorder_priority(0, 42),
            Err(ViewError::InvalidReorder { from: 0, to: 42, .. })
        );
        assert!(store.pending_save().is_none());
        assert_eq!(store.sort(), SortConfig::default());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_writes_immediately_and_cancels_the_timer() {
        let backend = InMemoryViewState::new();
        let store = store(&backend);
        store.hydrate().await;

        store.update_sort(|sort| {
            sort.push_criterion(SortCriterion::asc(SortField::TotalValue));
        });
        assert!(store.flush().await.unwrap());
        let saved = backend.get("view-config:pedidos").await.unwrap();
        assert!(saved.is_some());

        backend.delete("view-config:pedidos").await.unwrap();
        advance(1000).await;
        assert!(backend.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_restores_defaults_and_saves() {
        let backend = InMemoryViewState::new();
        let store = store(&backend);
        store.hydrate().await;

        store.set_criteria(vec![SortCriterion {
            field: SortField::Customer,
            dir: SortDirection::Desc,
        }]);
        store.set_search_query("x");
        store.reset();
        assert_eq!(store.search_query(), "");
        assert_eq!(store.sort(), SortConfig::default());
        assert!(store.pending_save().is_some());
    }
}
