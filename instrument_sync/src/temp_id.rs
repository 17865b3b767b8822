//! Placeholder ids for creates that the server hasn't confirmed yet.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use instrument_api::InstrumentId;

/// Yields strictly negative, strictly decreasing ids.
///
/// The sequence is seeded from the current time in microseconds, so ids from
/// two sessions started at different moments don't overlap in practice, and a
/// negative id can never be mistaken for a server-assigned one.
#[derive(Debug)]
pub struct TempIdGenerator {
    next: AtomicI64,
}

impl Default for TempIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TempIdGenerator {
    pub fn new() -> Self {
        let micros = Utc::now().timestamp_micros().max(1);
        Self::starting_at(-micros)
    }

    /// A generator whose first id is `first` (must be negative).
    pub fn starting_at(first: i64) -> Self {
        Self {
            next: AtomicI64::new(first.min(-1)),
        }
    }

    pub fn next_id(&self) -> InstrumentId {
        InstrumentId(self.next.fetch_sub(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_negative_and_decreasing() {
        let ids = TempIdGenerator::new();
        let a = ids.next_id();
        let b = ids.next_id();
        assert!(a.is_temporary());
        assert!(b.0 < a.0);
    }

    #[test]
    fn positive_seed_is_forced_negative() {
        let ids = TempIdGenerator::starting_at(5);
        assert_eq!(ids.next_id(), InstrumentId(-1));
        assert_eq!(ids.next_id(), InstrumentId(-2));
    }
}
