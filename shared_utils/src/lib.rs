//! Small helpers shared by the instrument crates: environment lookups and
//! configuration validation errors.

pub mod config;
pub mod env;
