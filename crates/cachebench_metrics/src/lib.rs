//! Cachebench Metrics - Timing and derived measurements
//!
//! Provides the monotonic time source every kernel reads, the arithmetic that
//! turns raw timings into bandwidth/ratio/efficiency figures, and an access
//! counter used by the instrumented (untimed) kernel variant.
//!
//! # Usage
//!
//! ```ignore
//! use cachebench_metrics::{Clock, MonotonicClock, bandwidth_gbs};
//!
//! let clock = MonotonicClock::new();
//! let (elapsed_ms, _) = clock.time(|| {
//!     // ... touch memory ...
//! });
//! println!("{:.2} GB/s", bandwidth_gbs(bytes, elapsed_ms));
//! ```

mod clock;
mod counter;
mod derived;

pub use clock::{Clock, MonotonicClock};
pub use counter::AccessCounter;
pub use derived::{bandwidth_gbs, efficiency_percent, ratio, thrashing_factor, BYTES_PER_GIB};
