//! Monotonic time source for kernel timing

use std::time::Instant;

/// A monotonic clock reporting fractional milliseconds.
///
/// Successive calls to [`Clock::now_ms`] never decrease within a process run.
pub trait Clock {
    fn now_ms(&self) -> f64;

    /// Run `f` between two clock reads and return the elapsed milliseconds
    /// together with the closure's result.
    #[inline]
    fn time<F, R>(&self, f: F) -> (f64, R)
    where
        F: FnOnce() -> R,
    {
        let start = self.now_ms();
        let result = f();
        let end = self.now_ms();
        (end - start, result)
    }
}

/// Wall-clock time measured from the moment the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now_ms(&self) -> f64 {
        (**self).now_ms()
    }
}
