use crate::error::{Error, Result};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::Duration;
use tokio::time::Instant;

/// Last-dispatch time per request key.
///
/// Check-then-record for one key happens under that key's shard lock, so two
/// callers can never both slip through the same window. Once the map outgrows
/// `capacity`, entries older than the window are swept; they could not block
/// anyone anyway.
pub struct RateLimitCache {
    entries: DashMap<String, Instant>,
    window: Duration,
    capacity: usize,
}

impl RateLimitCache {
    pub fn new(window: Duration, capacity: usize) -> Self {
        RateLimitCache {
            entries: DashMap::new(),
            window,
            capacity,
        }
    }

    pub fn check_and_record(&self, key: &str) -> Result<()> {
        let now = Instant::now();

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if now.duration_since(*entry.get()) < self.window {
                    return Err(Error::RateLimitExceeded {
                        key: key.to_string(),
                    });
                }
                entry.insert(now);
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
            }
        }

        if self.entries.len() > self.capacity {
            self.sweep(now);
        }
        Ok(())
    }

    fn sweep(&self, now: Instant) {
        let before = self.entries.len();
        self.entries.retain(|_, last| now.duration_since(*last) < self.window);
        tracing::debug!("Rate limit cache swept: {} -> {} entries", before, self.entries.len());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
