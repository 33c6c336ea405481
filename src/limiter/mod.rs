//! Limiter Module
//!
//! Per-client sliding-window admission control.
//!
//! ## Responsibilities
//! - Track request timestamps per key over a trailing window
//! - Admit iff fewer than `rate` requests remain in the window
//! - Keep read and mutate traffic in independent windows
//!
//! ## Data Structure Choice
//! One `Mutex<HashMap<key, VecDeque<Instant>>>` per class. Prune + push
//! happen under that mutex, so two concurrent callers can never both be
//! admitted past the ceiling. Buckets are created lazily and shrink by
//! pruning; idle keys are only removed by an explicit [`SlidingWindowLimiter::sweep`].

mod clock;
mod gate;
mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use gate::{AdmissionClass, RateGate};
pub use window::{Admission, SlidingWindowLimiter};
