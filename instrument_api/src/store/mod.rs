//! Remote store abstraction for instrument records.
//!
//! This module defines the [`InstrumentStore`] trait, the single seam between the
//! client session and whatever owns the records: the REST backend
//! ([`http::HttpStore`]) or a process-local stand-in ([`memory::InMemoryStore`]).
//!
//! The trait is async and object safe, so a session can hold an
//! `Arc<dyn InstrumentStore>` picked at runtime.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use instrument_api::{
//!     Instrument, InstrumentId, InstrumentPatch, InstrumentStore, ListFilter, NewInstrument,
//!     StoreError, StoreResult,
//! };
//!
//! struct Nothing;
//!
//! #[async_trait]
//! impl InstrumentStore for Nothing {
//!     async fn list(&self, _filter: &ListFilter) -> StoreResult<Vec<Instrument>> {
//!         Ok(vec![])
//!     }
//!     async fn get(&self, id: InstrumentId) -> StoreResult<Instrument> {
//!         Err(StoreError::NotFound { id })
//!     }
//!     async fn create(&self, _dto: &NewInstrument) -> StoreResult<Instrument> {
//!         Err(StoreError::validation("read-only"))
//!     }
//!     async fn update(&self, id: InstrumentId, _patch: &InstrumentPatch) -> StoreResult<Instrument> {
//!         Err(StoreError::NotFound { id })
//!     }
//!     async fn delete(&self, id: InstrumentId) -> StoreResult<()> {
//!         Err(StoreError::NotFound { id })
//!     }
//! }
//! ```

pub mod http;
pub mod memory;

use async_trait::async_trait;
use snafu::{Backtrace, Snafu};

use crate::{
    errors::StoreResult,
    models::{
        instrument::{Instrument, InstrumentId, InstrumentPatch, NewInstrument},
        list_filter::ListFilter,
    },
};

/// CRUD access to the authoritative instrument records.
#[async_trait]
pub trait InstrumentStore: Send + Sync {
    /// A flat batch of instruments matching the server-side filters. No total
    /// count is provided.
    async fn list(&self, filter: &ListFilter) -> StoreResult<Vec<Instrument>>;

    /// One instrument, or [`StoreError::NotFound`](crate::StoreError::NotFound).
    async fn get(&self, id: InstrumentId) -> StoreResult<Instrument>;

    /// Create an instrument; the store assigns the id and timestamps.
    async fn create(&self, dto: &NewInstrument) -> StoreResult<Instrument>;

    /// Apply a partial update and return the stored result.
    async fn update(&self, id: InstrumentId, patch: &InstrumentPatch) -> StoreResult<Instrument>;

    /// Delete an instrument.
    async fn delete(&self, id: InstrumentId) -> StoreResult<()>;
}

/// Errors that can occur while constructing a store.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreInitError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// API token contains characters not allowed in a header.
    #[snafu(display("Invalid API token format: {source}"))]
    InvalidToken {
        source: reqwest::header::InvalidHeaderValue,
        backtrace: Backtrace,
    },

    /// Base URL + prefix doesn't form a usable URL.
    #[snafu(display("Invalid base URL `{url}`: {message}"))]
    InvalidBaseUrl {
        url: String,
        message: String,
        backtrace: Backtrace,
    },

    /// Rate limit must allow at least one request per second.
    #[snafu(display("requests_per_second must be greater than zero"))]
    ZeroRate { backtrace: Backtrace },
}
