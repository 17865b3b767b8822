//! Optimistic create/update/delete on top of an [`InstrumentStore`].
//!
//! Every mutation follows the same shape:
//!
//! 1. validate the payload locally (nothing is touched on failure);
//! 2. apply the expected result to the [`EntityCache`] and the current
//!    [`ListSnapshot`](crate::snapshot::ListSnapshot) right away;
//! 3. await the store, the only suspension point;
//! 4. on success, swap the speculative entry for the server's version;
//! 5. on failure, restore the cache entry, mark the snapshot stale and reload
//!    it with the last params, then return the original error.
//!
//! Recovery is identical for every [`StoreError`] variant. Nothing is retried.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use instrument_api::{
    Instrument, InstrumentId, InstrumentPatch, InstrumentStore, NewInstrument, StoreError, StoreResult,
    models::list_filter::MAX_LIMIT,
    query::{self, Facets, QueryParams},
    validation::{validate_new, validate_patch},
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    cache::EntityCache,
    config::ClientConfig,
    debounce::Debouncer,
    snapshot::{ListSnapshot, ListSnapshotStore, SnapshotOp, diff::SnapshotDiff},
    temp_id::TempIdGenerator,
};

/// What a list screen renders: one page plus the numbers around it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListView {
    pub rows: Vec<Instrument>,
    /// Matching rows across all pages.
    pub total: usize,
    pub facets: Facets,
    pub page: usize,
    pub page_size: usize,
}

impl From<&ListSnapshot> for ListView {
    fn from(snap: &ListSnapshot) -> Self {
        Self {
            rows: snap.items.clone(),
            total: snap.total,
            facets: snap.facets.clone(),
            page: snap.params.page,
            page_size: snap.params.page_size,
        }
    }
}

/// A client's view of the instrument collection.
///
/// Owns its cache and list snapshot; two sessions never share state. Share a
/// session across tasks by wrapping it in an `Arc`.
pub struct InstrumentSession {
    store: Arc<dyn InstrumentStore>,
    cache: Arc<EntityCache>,
    snapshot: Arc<ListSnapshotStore>,
    temp_ids: TempIdGenerator,
    debouncer: Debouncer,
    list_limit: u32,
}

impl InstrumentSession {
    /// A session with empty state, fetching batches of up to 1000 rows and
    /// debouncing searches by the default quiet period.
    pub fn new(store: Arc<dyn InstrumentStore>) -> Self {
        Self {
            store,
            cache: Arc::new(EntityCache::new()),
            snapshot: Arc::new(ListSnapshotStore::new()),
            temp_ids: TempIdGenerator::new(),
            debouncer: Debouncer::new(ClientConfig::default().search_debounce()),
            list_limit: MAX_LIMIT,
        }
    }

    /// A session using the batch size and search quiet period from `config`.
    pub fn from_config(store: Arc<dyn InstrumentStore>, config: &ClientConfig) -> Self {
        Self::new(store)
            .with_list_limit(config.list_limit)
            .with_search_debounce(config.search_debounce())
    }

    pub fn with_list_limit(mut self, limit: u32) -> Self {
        self.list_limit = limit.clamp(1, MAX_LIMIT);
        self
    }

    pub fn with_search_debounce(mut self, quiet: Duration) -> Self {
        self.debouncer = Debouncer::new(quiet);
        self
    }

    /// Quiet period [`search`](Self::search) waits before fetching.
    pub fn search_debounce(&self) -> Duration {
        self.debouncer.quiet_period()
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    /// The current list snapshot, if a list has been loaded.
    pub fn snapshot(&self) -> Option<Arc<ListSnapshot>> {
        self.snapshot.current()
    }

    /// Drop all cached state.
    pub fn clear(&self) {
        self.cache.clear();
        self.snapshot.clear();
    }

    /// Fetch a batch, derive the requested page, and make it the current snapshot.
    ///
    /// Every fetched row is cached, including rows outside the page.
    #[instrument(skip(self), fields(query = ?params.query, page = params.page))]
    pub async fn list(&self, params: QueryParams) -> StoreResult<ListView> {
        let filter = params.to_list_filter(self.list_limit);
        let batch = self.store.list(&filter).await?;
        self.cache.put_all(batch.iter().cloned());

        let outcome = query::derive(&batch, &params);
        debug!(fetched = batch.len(), matching = outcome.total, "list derived");
        let snap = self.snapshot.load(params, outcome.rows, outcome.total, outcome.facets);
        Ok(ListView::from(&*snap))
    }

    /// Reload the current snapshot's params (or the defaults if none).
    pub async fn refresh(&self) -> StoreResult<ListView> {
        let params = self
            .snapshot
            .current()
            .map(|s| s.params.clone())
            .unwrap_or_default();
        self.list(params).await
    }

    /// Wait out the search quiet period, then list.
    ///
    /// Returns `Ok(None)` without touching the store when a newer search on
    /// this session superseded this one.
    pub async fn search(&self, params: QueryParams) -> StoreResult<Option<ListView>> {
        match self.debouncer.settle(params).await {
            Some(params) => self.list(params).await.map(Some),
            None => Ok(None),
        }
    }

    /// Cached instrument, or a GET on a miss.
    #[instrument(skip(self))]
    pub async fn get(&self, id: InstrumentId) -> StoreResult<Instrument> {
        if let Some(hit) = self.cache.get(id) {
            return Ok(hit);
        }
        self.fetch(id).await
    }

    #[instrument(skip(self, dto), fields(short_name = %dto.short_name))]
    pub async fn create(&self, dto: &NewInstrument) -> StoreResult<Instrument> {
        validate_new(dto)?;

        let temp_id = self.temp_ids.next_id();
        let speculative = Instrument::speculative(temp_id, dto, Utc::now());
        self.cache.put(speculative.clone());
        self.snapshot.apply_optimistic(&speculative, SnapshotOp::Insert);

        match self.store.create(dto).await {
            Ok(real) => {
                self.cache.remove(temp_id);
                self.cache.put(real.clone());
                self.snapshot.reconcile(temp_id, &real);
                info!(%temp_id, id = %real.id, "instrument created");
                Ok(real)
            }
            Err(err) => {
                self.cache.remove(temp_id);
                self.recover(None, err).await
            }
        }
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: InstrumentId, patch: &InstrumentPatch) -> StoreResult<Instrument> {
        validate_patch(patch)?;

        let prior = match self.cache.get(id) {
            Some(hit) => hit,
            None => self.fetch(id).await?,
        };
        let speculative = prior.merged(patch, Utc::now());
        self.cache.put(speculative.clone());
        self.snapshot.apply_optimistic(&speculative, SnapshotOp::Update);

        match self.store.update(id, patch).await {
            Ok(real) => {
                self.cache.put(real.clone());
                self.snapshot.reconcile(id, &real);
                info!(%id, "instrument updated");
                Ok(real)
            }
            Err(err) => {
                self.cache.put(prior);
                self.recover(Some(id), err).await
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: InstrumentId) -> StoreResult<()> {
        let prior = self.cache.remove(id);
        let listed = prior.clone().or_else(|| {
            self.snapshot
                .current()
                .and_then(|s| s.items.iter().find(|i| i.id == id).cloned())
        });
        if let Some(target) = &listed {
            self.snapshot.apply_optimistic(target, SnapshotOp::Remove);
        }

        match self.store.delete(id).await {
            Ok(()) => {
                info!(%id, "instrument deleted");
                Ok(())
            }
            Err(err) => {
                if let Some(prior) = prior {
                    self.cache.put(prior);
                }
                self.recover(Some(id), err).await
            }
        }
    }

    async fn fetch(&self, id: InstrumentId) -> StoreResult<Instrument> {
        match self.store.get(id).await {
            Ok(found) => {
                self.cache.put(found.clone());
                Ok(found)
            }
            Err(err) => {
                if err.is_not_found() {
                    self.cache.remove(id);
                }
                Err(err)
            }
        }
    }

    // Rollback path shared by all mutations. Always returns `Err(err)`.
    async fn recover<T>(&self, id: Option<InstrumentId>, err: StoreError) -> StoreResult<T> {
        warn!(error = %err, "mutation failed, rolling back");
        if let Some(id) = id.filter(|_| err.is_not_found()) {
            self.cache.remove(id);
        }

        let speculative = self.snapshot.current();
        if let Some(params) = self.snapshot.rollback() {
            match self.list(params).await {
                Ok(_) => {
                    if let (Some(before), Some(after)) = (speculative, self.snapshot.current()) {
                        debug!(diff = %SnapshotDiff::between(&before, &after), "rollback reload");
                    }
                }
                Err(reload_err) => {
                    warn!(error = %reload_err, "rollback reload failed, snapshot left stale");
                }
            }
        }
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use instrument_api::store::memory::InMemoryStore;

    fn session() -> InstrumentSession {
        InstrumentSession::new(Arc::new(InMemoryStore::with_demo_data()))
    }

    #[tokio::test]
    async fn list_populates_cache_and_snapshot() {
        let s = session();
        let view = s.list(QueryParams::default()).await.unwrap();
        assert_eq!(view.total, 5);
        assert_eq!(s.cache().len(), 5);
        assert!(!s.snapshot().unwrap().stale);
    }

    #[tokio::test]
    async fn refresh_without_snapshot_uses_defaults() {
        let s = session();
        let view = s.refresh().await.unwrap();
        assert_eq!(view.page_size, query::DEFAULT_PAGE_SIZE);
        assert_eq!(view.rows.len(), 5);
    }

    #[tokio::test]
    async fn invalid_create_touches_nothing() {
        let s = session();
        s.list(QueryParams::default()).await.unwrap();
        let before = s.snapshot().unwrap();

        let dto = NewInstrument::new("", "Nameless", instrument_api::InstrumentType::Equity, "USD", "USD");
        let err = s.create(&dto).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
        assert_eq!(s.cache().len(), 5);
        assert_eq!(*s.snapshot().unwrap(), *before);
    }

    #[test]
    fn search_debounce_follows_config() {
        let store: Arc<dyn InstrumentStore> = Arc::new(InMemoryStore::new());
        assert_eq!(InstrumentSession::new(store.clone()).search_debounce(), Duration::from_millis(300));

        let config = ClientConfig {
            search_debounce_ms: 0,
            list_limit: 50,
            ..Default::default()
        };
        let s = InstrumentSession::from_config(store, &config);
        assert_eq!(s.search_debounce(), Duration::ZERO);
        assert_eq!(s.list_limit, 50);
    }

    #[tokio::test]
    async fn clear_resets_state() {
        let s = session();
        s.list(QueryParams::default()).await.unwrap();
        s.clear();
        assert!(s.cache().is_empty());
        assert!(s.snapshot().is_none());
    }
}
