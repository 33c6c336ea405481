//! Sliding-window limiter

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::clock::{Clock, SystemClock};

/// Outcome of one admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Recorded; `remaining` more requests fit in the current window
    Allowed { remaining: usize },

    /// Not recorded; the oldest tracked request leaves the window after
    /// `retry_after`
    Denied { retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Per-key trailing-window request counter
pub struct SlidingWindowLimiter {
    clock: Arc<dyn Clock>,
    buckets: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// `true` if `key` may make another request now (and records it)
    pub fn admit(&self, key: &str, rate: usize, window: Duration) -> bool {
        self.check(key, rate, window).is_allowed()
    }

    /// Like [`Self::admit`] but reports remaining budget or retry delay
    pub fn check(&self, key: &str, rate: usize, window: Duration) -> Admission {
        let now = self.clock.now();
        let mut buckets = self.buckets.lock();
        let queue = buckets.entry(key.to_string()).or_default();

        while let Some(&oldest) = queue.front() {
            if now.saturating_duration_since(oldest) > window {
                queue.pop_front();
            } else {
                break;
            }
        }

        if queue.len() < rate {
            queue.push_back(now);
            Admission::Allowed {
                remaining: rate - queue.len(),
            }
        } else {
            let retry_after = queue
                .front()
                .map(|&oldest| window.saturating_sub(now.saturating_duration_since(oldest)))
                .unwrap_or(window);
            Admission::Denied { retry_after }
        }
    }

    /// Requests currently counted against `key`
    pub fn in_window(&self, key: &str) -> usize {
        self.buckets.lock().get(key).map_or(0, VecDeque::len)
    }

    /// Number of keys with state, including idle ones
    pub fn tracked_keys(&self) -> usize {
        self.buckets.lock().len()
    }

    /// Forget keys with no request inside `window`; returns how many
    pub fn sweep(&self, window: Duration) -> usize {
        let now = self.clock.now();
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets.retain(|_, queue| {
            queue
                .back()
                .is_some_and(|&newest| now.saturating_duration_since(newest) <= window)
        });
        before - buckets.len()
    }
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new()
    }
}
