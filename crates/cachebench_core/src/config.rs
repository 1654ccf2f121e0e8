//! Benchmark configuration

use crate::buffer::PAGE_SIZE;
use crate::topology::{CacheTopology, KIB, MIB};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("cache line size must be non-zero")]
    ZeroLineSize,

    #[error("alignment {alignment} is not a power of two")]
    BadAlignment { alignment: usize },

    #[error("cache level '{name}' must have non-zero size and ways")]
    EmptyLevel { name: String },

    #[error("cache level '{name}' of {size} bytes is smaller than twice its {ways} ways")]
    LevelTooSmall {
        name: String,
        size: usize,
        ways: usize,
    },

    #[error("min_size {min_size} exceeds max_size {max_size}")]
    SizeRange { min_size: usize, max_size: usize },

    #[error("stride list contains a zero stride")]
    ZeroStride,
}

/// Everything a run needs: the assumed topology plus sweep parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub topology: CacheTopology,
    /// Pass budget that iteration counts are scaled down from.
    pub base_iterations: u32,
    pub min_size: usize,
    pub max_size: usize,
    /// Floor for scaled iteration counts in the latency and read/write sweeps.
    pub min_iterations: u32,
    /// Floor for the detailed L3 sweep.
    pub detail_min_iterations: u32,
    pub stride_buffer_size: usize,
    pub strides: Vec<usize>,
    pub detail_sizes: Vec<usize>,
    pub alignment: usize,
    pub fill_byte: u8,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            topology: CacheTopology::default(),
            base_iterations: 1_000_000,
            min_size: 4 * KIB,
            max_size: 128 * MIB,
            min_iterations: 100,
            detail_min_iterations: 50,
            stride_buffer_size: MIB,
            strides: vec![1, 2, 4, 8, 16, 32, 64, 128, 256, 512],
            detail_sizes: [4, 6, 8, 10, 12, 16, 24, 32, 48, 64]
                .iter()
                .map(|mb| mb * MIB)
                .collect(),
            alignment: PAGE_SIZE,
            fill_byte: 0xAA,
        }
    }
}

impl BenchConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topology.line_size == 0 {
            return Err(ConfigError::ZeroLineSize);
        }
        if !self.alignment.is_power_of_two() {
            return Err(ConfigError::BadAlignment {
                alignment: self.alignment,
            });
        }
        for level in self.topology.levels() {
            if level.size == 0 || level.ways == 0 {
                return Err(ConfigError::EmptyLevel {
                    name: level.name.clone(),
                });
            }
            // The thrashing sweep walks 2 * ways addresses spaced size / (2 * ways) apart.
            if level.size / 2 < level.ways {
                return Err(ConfigError::LevelTooSmall {
                    name: level.name.clone(),
                    size: level.size,
                    ways: level.ways,
                });
            }
        }
        if self.min_size == 0 || self.min_size > self.max_size {
            return Err(ConfigError::SizeRange {
                min_size: self.min_size,
                max_size: self.max_size,
            });
        }
        if self.strides.contains(&0) {
            return Err(ConfigError::ZeroStride);
        }
        Ok(())
    }

    /// Passes for a buffer of `size` bytes: fewer for larger buffers, never
    /// below `floor`.
    pub fn scaled_iterations(&self, size: usize, floor: u32) -> u32 {
        let steps = (size / self.min_size).saturating_add(1) as u64;
        let scaled = u64::from(self.base_iterations) / steps;
        (scaled as u32).max(floor)
    }

    /// Doubling sizes from `min_size` up to and including `max_size`.
    pub fn latency_sizes(&self) -> Vec<usize> {
        std::iter::successors(Some(self.min_size), |&s| s.checked_mul(2))
            .take_while(|&s| s <= self.max_size)
            .collect()
    }
}
