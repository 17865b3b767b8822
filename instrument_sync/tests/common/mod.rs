#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use instrument_api::{
    Instrument, InstrumentId, InstrumentPatch, InstrumentStore, InstrumentType, ListFilter, NewInstrument,
    StoreError, StoreResult, store::memory::InMemoryStore,
};
use instrument_sync::InstrumentSession;
use tokio::sync::oneshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Get,
    Create,
    Update,
    Delete,
}

/// Lets a test observe the session while a store call is in flight.
pub struct Gate {
    /// Fires once the store call has started (the optimistic phase is over).
    pub entered: oneshot::Receiver<()>,
    /// Send to let the store call proceed.
    pub release: oneshot::Sender<()>,
}

type Hold = (oneshot::Sender<()>, oneshot::Receiver<()>);

/// An [`InMemoryStore`] wrapper that counts calls, can fail them on demand,
/// and can pause them.
#[derive(Default)]
pub struct ScriptedStore {
    pub inner: Arc<InMemoryStore>,
    calls: Mutex<HashMap<Op, usize>>,
    failures: Mutex<HashMap<Op, VecDeque<StoreError>>>,
    holds: Mutex<HashMap<Op, Hold>>,
    total_calls: AtomicUsize,
}

impl ScriptedStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner: Arc::new(inner),
            ..Default::default()
        }
    }

    pub fn calls(&self, op: Op) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }

    /// The next `op` call fails with `err` instead of reaching the inner store.
    pub fn fail_next(&self, op: Op, err: StoreError) {
        self.failures.lock().unwrap().entry(op).or_default().push_back(err);
    }

    /// Drop every queued failure.
    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// The next `op` call waits for `Gate::release` before doing anything.
    pub fn hold_next(&self, op: Op) -> Gate {
        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        self.holds.lock().unwrap().insert(op, (entered_tx, release_rx));
        Gate {
            entered: entered_rx,
            release: release_tx,
        }
    }

    async fn enter(&self, op: Op) -> StoreResult<()> {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
        self.total_calls.fetch_add(1, Ordering::SeqCst);

        let hold = self.holds.lock().unwrap().remove(&op);
        if let Some((entered, release)) = hold {
            let _ = entered.send(());
            let _ = release.await;
        }

        let injected = self.failures.lock().unwrap().get_mut(&op).and_then(VecDeque::pop_front);
        match injected {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl InstrumentStore for ScriptedStore {
    async fn list(&self, filter: &ListFilter) -> StoreResult<Vec<Instrument>> {
        self.enter(Op::List).await?;
        self.inner.list(filter).await
    }

    async fn get(&self, id: InstrumentId) -> StoreResult<Instrument> {
        self.enter(Op::Get).await?;
        self.inner.get(id).await
    }

    async fn create(&self, dto: &NewInstrument) -> StoreResult<Instrument> {
        self.enter(Op::Create).await?;
        self.inner.create(dto).await
    }

    async fn update(&self, id: InstrumentId, patch: &InstrumentPatch) -> StoreResult<Instrument> {
        self.enter(Op::Update).await?;
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: InstrumentId) -> StoreResult<()> {
        self.enter(Op::Delete).await?;
        self.inner.delete(id).await
    }
}

/// A session over a scripted store seeded with `seed` (ids 1, 2, ...).
pub async fn setup(seed: Vec<NewInstrument>) -> (Arc<ScriptedStore>, Arc<InstrumentSession>) {
    let store = Arc::new(ScriptedStore::new(InMemoryStore::new()));
    // straight to the inner store so no calls are counted
    for dto in &seed {
        store.inner.create(dto).await.expect("seed");
    }
    let session = Arc::new(InstrumentSession::new(store.clone()));
    (store, session)
}

/// Same as [`setup`] but with the demo data set.
pub fn setup_demo() -> (Arc<ScriptedStore>, Arc<InstrumentSession>) {
    let store = Arc::new(ScriptedStore::new(InMemoryStore::with_demo_data()));
    let session = Arc::new(InstrumentSession::new(store.clone()));
    (store, session)
}

pub fn apple() -> NewInstrument {
    let mut dto = NewInstrument::new("AAPL", "Apple Inc.", InstrumentType::Equity, "USD", "USD");
    dto.isin = Some("US0378331005".into());
    dto.yahoo_symbol = Some("AAPL".into());
    dto
}

pub fn msft() -> NewInstrument {
    let mut dto = NewInstrument::new("MSFT", "Microsoft Corporation", InstrumentType::Equity, "USD", "USD");
    dto.isin = Some("US5949181045".into());
    dto
}
