//! Two-class admission gate
//!
//! Reads and mutations are limited independently so a burst of writes
//! cannot starve a client's reads, and vice versa.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Result, StoreError};

use super::clock::{Clock, SystemClock};
use super::window::{Admission, SlidingWindowLimiter};

/// Which ceiling a request counts against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdmissionClass {
    Read,
    Mutate,
}

impl fmt::Display for AdmissionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Mutate => f.write_str("mutate"),
        }
    }
}

/// Per-class limiters with their configured ceilings
pub struct RateGate {
    read: SlidingWindowLimiter,
    mutate: SlidingWindowLimiter,
    read_rate: usize,
    mutate_rate: usize,
    window: Duration,
}

impl RateGate {
    pub fn new(read_rate: usize, mutate_rate: usize, window: Duration) -> Self {
        Self::with_clock(read_rate, mutate_rate, window, Arc::new(SystemClock))
    }

    pub fn with_clock(
        read_rate: usize,
        mutate_rate: usize,
        window: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            read: SlidingWindowLimiter::with_clock(Arc::clone(&clock)),
            mutate: SlidingWindowLimiter::with_clock(clock),
            read_rate,
            mutate_rate,
            window,
        }
    }

    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Self {
        Self::with_clock(config.read_rate, config.mutate_rate, config.rate_window, clock)
    }

    /// Admit one `class` request from `key` or fail with `RateExceeded`
    pub fn admit(&self, class: AdmissionClass, key: &str) -> Result<()> {
        let (limiter, rate) = match class {
            AdmissionClass::Read => (&self.read, self.read_rate),
            AdmissionClass::Mutate => (&self.mutate, self.mutate_rate),
        };

        match limiter.check(key, rate, self.window) {
            Admission::Allowed { .. } => Ok(()),
            Admission::Denied { retry_after } => {
                tracing::debug!("Refused {} request from {}", class, key);
                Err(StoreError::RateExceeded { class, retry_after })
            }
        }
    }

    pub fn limiter(&self, class: AdmissionClass) -> &SlidingWindowLimiter {
        match class {
            AdmissionClass::Read => &self.read,
            AdmissionClass::Mutate => &self.mutate,
        }
    }

    /// Drop idle keys from both classes
    pub fn sweep(&self) -> usize {
        self.read.sweep(self.window) + self.mutate.sweep(self.window)
    }
}
