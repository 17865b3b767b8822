//! The last-known page of the instrument list, and the speculative edits
//! applied to it while a mutation is in flight.
//!
//! A [`ListSnapshot`] is immutable once published; every operation on
//! [`ListSnapshotStore`] builds a new one and swaps it in, so readers holding
//! an `Arc` from [`ListSnapshotStore::current`] never observe a partial edit.

pub mod diff;

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use instrument_api::{
    Instrument, InstrumentId,
    query::{Facets, QueryParams},
};
use serde::Serialize;
use tracing::debug;

/// One page of derived list rows plus the params that produced it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListSnapshot {
    pub params: QueryParams,
    pub items: Vec<Instrument>,
    /// Matching rows across all pages.
    pub total: usize,
    pub facets: Facets,
    /// Set by [`ListSnapshotStore::rollback`]: the content can no longer be
    /// trusted and a reload with `params` is owed.
    pub stale: bool,
}

impl ListSnapshot {
    /// Position of the first item with `id`.
    pub fn position(&self, id: InstrumentId) -> Option<usize> {
        self.items.iter().position(|i| i.id == id)
    }

    pub fn contains(&self, id: InstrumentId) -> bool {
        self.position(id).is_some()
    }
}

/// Speculative edit kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotOp {
    /// Append the entity, `total + 1`.
    Insert,
    /// Replace the item with the same id; no-op if absent.
    Update,
    /// Drop the item with the id, `total - 1` (floor 0); no-op if absent.
    Remove,
}

/// Holder of the current [`ListSnapshot`]. Empty until the first `load`.
#[derive(Debug, Default)]
pub struct ListSnapshotStore {
    current: ArcSwapOption<ListSnapshot>,
}

impl ListSnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock-free read of the current snapshot.
    pub fn current(&self) -> Option<Arc<ListSnapshot>> {
        self.current.load_full()
    }

    /// Replace the snapshot with a freshly fetched page; clears `stale`.
    pub fn load(&self, params: QueryParams, items: Vec<Instrument>, total: usize, facets: Facets) -> Arc<ListSnapshot> {
        debug!(rows = items.len(), total, "snapshot load");
        let snap = Arc::new(ListSnapshot {
            params,
            items,
            total,
            facets,
            stale: false,
        });
        self.current.store(Some(Arc::clone(&snap)));
        snap
    }

    /// Apply a speculative edit. Does nothing before the first `load`.
    pub fn apply_optimistic(&self, entity: &Instrument, op: SnapshotOp) {
        self.edit(|snap| match op {
            SnapshotOp::Insert => {
                snap.items.push(entity.clone());
                snap.total += 1;
            }
            SnapshotOp::Update => {
                if let Some(pos) = snap.position(entity.id) {
                    snap.items[pos] = entity.clone();
                }
            }
            SnapshotOp::Remove => {
                if let Some(pos) = snap.position(entity.id) {
                    snap.items.remove(pos);
                    snap.total = snap.total.saturating_sub(1);
                }
            }
        });
        debug!(id = %entity.id, ?op, "snapshot optimistic edit");
    }

    /// Swap the speculative entry for the server's version.
    ///
    /// The first item whose id is `temp_id` or `real.id` is overwritten with
    /// `real`. Any further item carrying either id is dropped (with `total`
    /// decremented, floor 0), so `real.id` ends up listed exactly once. No-op
    /// if neither id is present.
    pub fn reconcile(&self, temp_id: InstrumentId, real: &Instrument) {
        self.edit(|snap| {
            let is_match = |i: &Instrument| i.id == temp_id || i.id == real.id;
            let Some(first) = snap.items.iter().position(is_match) else {
                return;
            };
            snap.items[first] = real.clone();

            let before = snap.items.len();
            let mut idx = 0;
            snap.items.retain(|i| {
                let keep = idx <= first || !is_match(i);
                idx += 1;
                keep
            });
            let dropped = before - snap.items.len();
            snap.total = snap.total.saturating_sub(dropped);
        });
        debug!(%temp_id, real_id = %real.id, "snapshot reconcile");
    }

    /// Mark the snapshot stale and hand back the params a reload should use.
    ///
    /// Returns `None` if nothing was ever loaded.
    pub fn rollback(&self) -> Option<QueryParams> {
        let mut params = None;
        self.edit(|snap| {
            snap.stale = true;
            params = Some(snap.params.clone());
        });
        params
    }

    /// Forget the snapshot entirely.
    pub fn clear(&self) {
        self.current.store(None);
    }

    fn edit(&self, mut f: impl FnMut(&mut ListSnapshot)) {
        self.current.rcu(|cur| {
            cur.as_ref().map(|snap| {
                let mut next = ListSnapshot::clone(snap);
                f(&mut next);
                Arc::new(next)
            })
        });
    }
}
