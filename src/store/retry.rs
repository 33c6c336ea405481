//! Bounded retry with exponential backoff
//!
//! Used for the one operation that is allowed to retry: replacing a file
//! that another process still holds open.

use std::io;
use std::thread;
use std::time::Duration;

/// How many times, and how patiently, to retry a transient failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1)
    pub max_attempts: u32,

    /// Delay after the first failure; doubles after each further failure
    pub base_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(800),
        }
    }
}

/// Why a retried operation gave up
#[derive(Debug)]
pub enum RetryError<E> {
    /// Failed with a non-transient error; not retried
    Fatal(E),

    /// Still failing transiently after every allowed attempt
    Exhausted { attempts: u32, last: E },
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay: base_delay.saturating_mul(16),
        }
    }

    /// Retry immediately, without sleeping (tests, tmpfs)
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Sleep applied after the `failures`-th consecutive failure (1-based)
    pub fn delay_after(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails fatally, or attempts run out
    ///
    /// `op` receives the zero-based attempt number.
    pub fn run<T, E, F, P>(&self, mut op: F, is_transient: P) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Result<T, E>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if !is_transient(&e) => return Err(RetryError::Fatal(e)),
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_attempts {
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            last: e,
                        });
                    }
                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        "Transient failure (attempt {}/{}): {}; retrying in {:?}",
                        attempt,
                        max_attempts,
                        e,
                        delay
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
            }
        }
    }
}

/// Replace failures worth retrying: the target is held open elsewhere
///
/// Windows reports sharing violations as `PermissionDenied`.
pub fn is_transient_replace_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::PermissionDenied | io::ErrorKind::Interrupted
    )
}
