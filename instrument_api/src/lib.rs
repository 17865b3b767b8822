//! Financial instrument records and the remote store that owns them.
//!
//! - [`models`]: the wire model (`Instrument`, create/update payloads, list filters).
//! - [`validation`]: client-side pre-validation mirroring the server's field rules.
//! - [`query`]: the pure filter/search/sort/paginate/facet derivation shared by
//!   the client session and the in-memory store.
//! - [`store`]: the [`store::InstrumentStore`] trait plus HTTP and in-memory
//!   implementations.
//! - [`errors`]: the error taxonomy every store reports in.

pub mod errors;
pub mod models;
pub mod query;
pub mod store;
pub mod validation;

pub use errors::{StoreError, StoreResult};
pub use models::{
    enums::InstrumentType,
    instrument::{Instrument, InstrumentId, InstrumentPatch, NewInstrument},
    list_filter::ListFilter,
};
pub use store::InstrumentStore;
