//! Optimistic client-side access to the instrument collection.
//!
//! [`session::InstrumentSession`] is the entry point: it owns an
//! [`cache::EntityCache`] and a [`snapshot::ListSnapshotStore`], reads through
//! an [`instrument_api::InstrumentStore`], and applies create/update/delete
//! speculatively before the store confirms them.

pub mod cache;
pub mod config;
pub mod debounce;
pub mod session;
pub mod snapshot;
pub mod temp_id;

pub use session::{InstrumentSession, ListView};
