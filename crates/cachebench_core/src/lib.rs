//! Cachebench Core
//!
//! Measures how a CPU's cache hierarchy shapes memory-access latency:
//! - Page-aligned, pre-filled benchmark buffers
//! - Timed access kernels (sequential, random, strided, write, associativity probe)
//! - Sweep drivers that turn timings into bandwidth, ratio and efficiency tables
//! - Plain-text reporting against a configured cache topology

pub mod buffer;
pub mod config;
pub mod kernel;
pub mod pattern;
pub mod report;
pub mod sweep;
pub mod topology;

pub use buffer::{AlignedBuffer, AllocError, PAGE_SIZE};
pub use config::{BenchConfig, ConfigError};
pub use pattern::AccessPattern;
pub use sweep::Harness;
pub use topology::{CacheLevel, CacheTopology};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
