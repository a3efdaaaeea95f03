//! Fixed-window rate limiting keyed by client ip.
//!
//! The store is a trait so multi-instance deployments can plug in a shared
//! backend; the in-memory implementation is the default and what tests use.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u32,
}

pub trait RateLimitStore: Send + Sync {
    /// Count one attempt against `key` and decide whether it is allowed.
    fn hit(&self, key: &str, window_secs: i64, max: u32, now: i64) -> Decision;

    /// Refund the most recent attempt (successful requests are excluded
    /// from the auth counter).
    fn forgive(&self, key: &str);
}

#[derive(Default)]
pub struct MemoryRateLimitStore {
    // key -> (window start, attempts in window)
    windows: Mutex<HashMap<String, (i64, u32)>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    fn hit(&self, key: &str, window_secs: i64, max: u32, now: i64) -> Decision {
        let mut windows = match self.windows.lock() {
            Ok(w) => w,
            // A poisoned lock should never lock clients out.
            Err(_) => return Decision { allowed: true, remaining: max },
        };

        // Drop windows that have lapsed so the map stays small.
        windows.retain(|_, (start, _)| now - *start < window_secs);

        let entry = windows.entry(key.to_string()).or_insert((now, 0));
        if now - entry.0 >= window_secs {
            *entry = (now, 0);
        }
        entry.1 += 1;

        if entry.1 > max {
            Decision { allowed: false, remaining: 0 }
        } else {
            Decision { allowed: true, remaining: max - entry.1 }
        }
    }

    fn forgive(&self, key: &str) {
        if let Ok(mut windows) = self.windows.lock() {
            if let Some((_, count)) = windows.get_mut(key) {
                *count = count.saturating_sub(1);
            }
        }
    }
}

/// A configured limiter: window + cap over a pluggable store.
pub struct RateLimiter {
    store: Box<dyn RateLimitStore>,
    window_secs: i64,
    max: u32,
}

impl RateLimiter {
    pub fn new(store: Box<dyn RateLimitStore>, window_secs: i64, max: u32) -> Self {
        Self { store, window_secs, max }
    }

    pub fn in_memory(window_secs: i64, max: u32) -> Self {
        Self::new(Box::new(MemoryRateLimitStore::new()), window_secs, max)
    }

    pub fn check(&self, key: &str, now: i64) -> Decision {
        self.store.hit(key, self.window_secs, self.max, now)
    }

    pub fn forgive(&self, key: &str) {
        self.store.forgive(key);
    }
}
