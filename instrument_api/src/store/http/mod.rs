//! REST implementation of [`InstrumentStore`](crate::store::InstrumentStore)
//! against the `/instruments/` resource.

pub mod response;
pub mod store;

pub use store::{HttpStore, HttpStoreOptions, TOKEN_ENV_VAR};
