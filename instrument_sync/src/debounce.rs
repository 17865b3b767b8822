//! Quiet-period debouncing for search input.
//!
//! Each keystroke calls [`Debouncer::settle`]; only the call that is still the
//! newest once the quiet period has elapsed gets its value back, so a burst of
//! typing triggers a single list fetch.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use tracing::trace;

#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    generation: AtomicU64,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            generation: AtomicU64::new(0),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Wait out the quiet period; `Some(value)` if no newer call arrived meanwhile.
    pub async fn settle<T>(&self, value: T) -> Option<T> {
        let mine = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        tokio::time::sleep(self.quiet).await;
        if self.generation.load(Ordering::Acquire) == mine {
            Some(value)
        } else {
            trace!(generation = mine, "superseded");
            None
        }
    }
}
