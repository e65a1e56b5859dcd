//! Time-bounded reuse of fetched source tables.

use std::time::{Duration, Instant};
use tracing::debug;

/// Holds one loaded value and hands it back until `ttl` has elapsed since it was loaded.
#[derive(Debug)]
pub struct SnapshotCache<T> {
    ttl: Duration,
    entry: Option<(Instant, T)>,
}

impl<T> SnapshotCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    pub fn is_fresh(&self, now: Instant) -> bool {
        self.entry
            .as_ref()
            .is_some_and(|(at, _)| now.saturating_duration_since(*at) < self.ttl)
    }

    /// The cached value if fresh at `now`; otherwise the result of `load`, which replaces it.
    ///
    /// A failed load leaves any previous value in place but still returns the error.
    pub fn get_or_try_load<E>(
        &mut self,
        now: Instant,
        load: impl FnOnce() -> Result<T, E>,
    ) -> Result<&T, E> {
        self.get_or_try_load_or_stale(now, load, |_| false)
    }

    /// Like [`Self::get_or_try_load`], but a failed reload hands back the previous value when
    /// `serve_stale` accepts the error. The stale value keeps its load time, so the next call
    /// tries again.
    pub fn get_or_try_load_or_stale<E>(
        &mut self,
        now: Instant,
        load: impl FnOnce() -> Result<T, E>,
        serve_stale: impl FnOnce(&E) -> bool,
    ) -> Result<&T, E> {
        let fresh = self.is_fresh(now);
        let entry = match self.entry.take() {
            Some(entry) if fresh => entry,
            previous => {
                debug!(had_entry = previous.is_some(), "snapshot stale; reloading");
                match load() {
                    Ok(value) => (now, value),
                    Err(e) => match previous {
                        Some(stale) if serve_stale(&e) => stale,
                        previous => {
                            self.entry = previous;
                            return Err(e);
                        }
                    },
                }
            }
        };
        Ok(&self.entry.insert(entry).1)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
