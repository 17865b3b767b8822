//! Process-local [`InstrumentStore`] used by tests and the CLI's `--memory` mode.
//!
//! Behaves like the REST backend as far as the client can tell: ids are
//! assigned from 1 upward, payloads are validated, ISINs are unique, LIST
//! filters with the shared [`matches_filters`] and pages with `offset`/`limit`.

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::{
    errors::{StoreError, StoreResult},
    models::{
        enums::InstrumentType,
        instrument::{Instrument, InstrumentId, InstrumentPatch, NewInstrument},
        list_filter::{ListFilter, MAX_LIMIT},
    },
    query::matches_filters,
    store::InstrumentStore,
    validation::{validate_new, validate_patch},
};

#[derive(Debug)]
struct Inner {
    rows: BTreeMap<InstrumentId, Instrument>,
    next_id: i64,
}

/// In-memory instrument table.
#[derive(Debug)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                rows: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// A store pre-populated with a handful of well-known instruments.
    pub fn with_demo_data() -> Self {
        let store = Self::new();
        {
            let mut inner = store.lock();
            for dto in demo_instruments() {
                insert_row(&mut inner, dto);
            }
        }
        store
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every row, ordered by id. Test helper, bypasses the async API.
    pub fn rows(&self) -> Vec<Instrument> {
        self.lock().rows.values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic mid-write leaves no partial row behind, so the data is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn insert_row(inner: &mut Inner, dto: NewInstrument) -> Instrument {
    let id = InstrumentId(inner.next_id);
    inner.next_id += 1;
    let row = Instrument::speculative(id, &dto, Utc::now());
    inner.rows.insert(id, row.clone());
    row
}

fn isin_taken(inner: &Inner, isin: Option<&str>, except: Option<InstrumentId>) -> bool {
    let Some(isin) = isin else { return false };
    inner
        .rows
        .values()
        .any(|r| Some(r.id) != except && r.attrs.isin.as_deref() == Some(isin))
}

#[async_trait]
impl InstrumentStore for InMemoryStore {
    async fn list(&self, filter: &ListFilter) -> StoreResult<Vec<Instrument>> {
        let inner = self.lock();
        let limit = filter.limit.clamp(1, MAX_LIMIT) as usize;
        let rows: Vec<Instrument> = inner
            .rows
            .values()
            .filter(|r| {
                matches_filters(
                    r,
                    filter.instrument_type,
                    filter.sector.as_deref(),
                    filter.country.as_deref(),
                )
            })
            .skip(filter.offset as usize)
            .take(limit)
            .cloned()
            .collect();
        debug!(returned = rows.len(), "in-memory list");
        Ok(rows)
    }

    async fn get(&self, id: InstrumentId) -> StoreResult<Instrument> {
        self.lock().rows.get(&id).cloned().ok_or(StoreError::NotFound { id })
    }

    async fn create(&self, dto: &NewInstrument) -> StoreResult<Instrument> {
        validate_new(dto)?;
        let mut inner = self.lock();
        if isin_taken(&inner, dto.isin.as_deref(), None) {
            return Err(StoreError::validation(format!(
                "Instrument with ISIN {} already exists",
                dto.isin.as_deref().unwrap_or_default()
            )));
        }
        Ok(insert_row(&mut inner, dto.clone()))
    }

    async fn update(&self, id: InstrumentId, patch: &InstrumentPatch) -> StoreResult<Instrument> {
        validate_patch(patch)?;
        let mut inner = self.lock();
        let current = inner.rows.get(&id).ok_or(StoreError::NotFound { id })?;
        if isin_taken(&inner, patch.isin.as_deref(), Some(id)) {
            return Err(StoreError::validation(format!(
                "Instrument with ISIN {} already exists",
                patch.isin.as_deref().unwrap_or_default()
            )));
        }
        let next = current.merged(patch, Utc::now());
        inner.rows.insert(id, next.clone());
        Ok(next)
    }

    async fn delete(&self, id: InstrumentId) -> StoreResult<()> {
        self.lock()
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound { id })
    }
}

fn demo_instruments() -> Vec<NewInstrument> {
    let mut apple = NewInstrument::new("AAPL", "Apple Inc.", InstrumentType::Equity, "USD", "USD");
    apple.isin = Some("US0378331005".into());
    apple.sector = Some("Technology".into());
    apple.country = Some("US".into());
    apple.yahoo_symbol = Some("AAPL".into());
    apple.reuters_symbol = Some("AAPL.O".into());
    apple.last_price = Some(189.84);

    let mut nestle = NewInstrument::new("NESN", "Nestle S.A.", InstrumentType::Equity, "CHF", "CHF");
    nestle.isin = Some("CH0038863350".into());
    nestle.sector = Some("Consumer Staples".into());
    nestle.country = Some("CH".into());
    nestle.yahoo_symbol = Some("NESN.SW".into());
    nestle.last_price = Some(97.12);

    let mut tbond = NewInstrument::new("UST10Y", "US Treasury 10Y", InstrumentType::Bond, "USD", "USD");
    tbond.isin = Some("US91282CJJ18".into());
    tbond.sector = Some("Government".into());
    tbond.country = Some("US".into());
    tbond.interest_rate = Some(4.5);
    tbond.interest_period = Some(180);

    let mut spy = NewInstrument::new("SPY", "SPDR S&P 500 ETF Trust", InstrumentType::Etf, "USD", "USD");
    spy.isin = Some("US78462F1030".into());
    spy.sector = Some("Broad Market".into());
    spy.country = Some("US".into());
    spy.yahoo_symbol = Some("SPY".into());

    let mut es = NewInstrument::new("ESZ5", "E-mini S&P 500 Dec 2025", InstrumentType::Future, "USD", "USD");
    es.country = Some("US".into());
    es.contract_size = Some(50);
    es.initial_margin = Some(12_650.0);

    vec![apple, nestle, tbond, spy, es]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_data_is_valid_and_unique() {
        let store = InMemoryStore::with_demo_data();
        assert_eq!(store.len(), 5);
        for row in store.rows() {
            assert!(validate_new(&row.attrs).is_ok(), "{} fails validation", row.attrs.short_name);
        }
        let first = store.get(InstrumentId(1)).await.unwrap();
        assert_eq!(first.attrs.short_name, "AAPL");
    }

    #[tokio::test]
    async fn list_pages_after_filtering() {
        let store = InMemoryStore::with_demo_data();
        let us = ListFilter {
            country: Some("US".into()),
            limit: 2,
            offset: 1,
            ..Default::default()
        };
        let got: Vec<i64> = store.list(&us).await.unwrap().iter().map(|r| r.id.0).collect();
        // US rows are ids 1, 3, 4, 5
        assert_eq!(got, vec![3, 4]);
    }
}
