//! Sleep abstraction for the runner's pauses and retry backoff.
//!
//! Tests substitute a recording sleeper so retry loops run instantly and the
//! number and length of pauses can be asserted.

use std::time::Duration;

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Blocks the current thread.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
