//! Lock-free, read-mostly entity cache keyed by instrument id.
//!
//! Readers call [`EntityCache::get`], which loads an `Arc<HashMap<..>>`
//! snapshot without contention. Writers clone the map, modify the clone and
//! swap it in with [`ArcSwap::rcu`], so a reader sees either the old or the new
//! map, never a half-applied write.
//!
//! Implementation notes:
//! - The cache is owned by the session, not a global; two sessions never share entries.
//! - No TTL. Entries live until they are overwritten, removed, or the cache is cleared.
//! - Writes are O(n) in the number of cached entities. Fine for a few thousand instruments.

use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use instrument_api::{Instrument, InstrumentId};
use tracing::trace;

/// Snapshot type held inside the cache.
pub type EntityMap = HashMap<InstrumentId, Instrument>;

/// Most recently known value of each instrument, including speculative ones.
#[derive(Debug)]
pub struct EntityCache {
    map: ArcSwap<EntityMap>,
}

impl Default for EntityCache {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self {
            map: ArcSwap::from_pointee(EntityMap::new()),
        }
    }

    /// The cached instrument, or `None` on a miss. Never touches the network.
    pub fn get(&self, id: InstrumentId) -> Option<Instrument> {
        self.map.load().get(&id).cloned()
    }

    /// `true` if `id` is cached.
    pub fn contains(&self, id: InstrumentId) -> bool {
        self.map.load().contains_key(&id)
    }

    /// Insert or overwrite the entry for `entity.id`.
    pub fn put(&self, entity: Instrument) {
        trace!(id = %entity.id, "cache put");
        self.map.rcu(|current| {
            let mut next = EntityMap::clone(current);
            next.insert(entity.id, entity.clone());
            next
        });
    }

    /// Insert or overwrite many entries in one swap.
    pub fn put_all<I>(&self, entities: I)
    where
        I: IntoIterator<Item = Instrument>,
    {
        let batch: Vec<Instrument> = entities.into_iter().collect();
        if batch.is_empty() {
            return;
        }
        trace!(count = batch.len(), "cache put_all");
        self.map.rcu(|current| {
            let mut next = EntityMap::clone(current);
            next.extend(batch.iter().map(|e| (e.id, e.clone())));
            next
        });
    }

    /// Remove the entry for `id`, returning what was cached. No-op on a miss.
    pub fn remove(&self, id: InstrumentId) -> Option<Instrument> {
        if !self.contains(id) {
            return None;
        }
        trace!(%id, "cache remove");
        let prev = self.map.rcu(|current| {
            let mut next = EntityMap::clone(current);
            next.remove(&id);
            next
        });
        prev.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.map.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.load().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.map.store(Arc::new(EntityMap::new()));
    }

    /// Returns an `Arc` snapshot (if a caller needs to iterate or inspect).
    pub fn snapshot(&self) -> Arc<EntityMap> {
        self.map.load_full()
    }
}
