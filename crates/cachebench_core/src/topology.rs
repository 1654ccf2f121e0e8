//! Assumed cache hierarchy.
//!
//! The benchmark never detects hardware; it is pointed at a topology and
//! reports how the measured timings line up with it. Defaults describe an
//! AMD Ryzen 5600.

use serde::{Deserialize, Serialize};

pub const KIB: usize = 1024;
pub const MIB: usize = 1024 * 1024;

/// Cache line size assumed by the sequential kernels, in bytes.
pub const DEFAULT_LINE_SIZE: usize = 64;

/// One level of the data cache hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheLevel {
    pub name: String,
    pub size: usize, // bytes
    pub ways: usize,
    pub shared: bool,
}

impl CacheLevel {
    pub fn new(name: &str, size: usize, ways: usize, shared: bool) -> Self {
        Self {
            name: name.to_string(),
            size,
            ways,
            shared,
        }
    }

    /// Row label such as `L1 (32KB)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, compact_size(self.size))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheTopology {
    pub model: String,
    pub line_size: usize, // bytes
    pub l1: CacheLevel,
    pub l2: CacheLevel,
    pub l3: CacheLevel,
}

impl CacheTopology {
    pub fn ryzen_5600() -> Self {
        Self {
            model: "AMD Ryzen 5600".to_string(),
            line_size: DEFAULT_LINE_SIZE,
            l1: CacheLevel::new("L1", 32 * KIB, 8, false),
            l2: CacheLevel::new("L2", 512 * KIB, 8, false),
            l3: CacheLevel::new("L3", 32 * MIB, 16, true),
        }
    }

    /// Levels from closest to farthest.
    pub fn levels(&self) -> [&CacheLevel; 3] {
        [&self.l1, &self.l2, &self.l3]
    }

    /// Working set that no longer fits in the last level and spills to RAM,
    /// or `None` if it does not fit in `usize`.
    pub fn ram_probe_size(&self) -> Option<usize> {
        self.l3.size.checked_mul(2)
    }
}

impl Default for CacheTopology {
    fn default() -> Self {
        Self::ryzen_5600()
    }
}

/// `512 B`, `32 KB`, `128 MB`: the spaced form used in the latency table.
pub fn spaced_size(bytes: usize) -> String {
    if bytes < KIB {
        format!("{} B", bytes)
    } else if bytes < MIB {
        format!("{} KB", bytes / KIB)
    } else {
        format!("{} MB", bytes / MIB)
    }
}

/// `512B`, `32KB`, `64MB`: the compact form used in row labels.
pub fn compact_size(bytes: usize) -> String {
    spaced_size(bytes).replace(' ', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_topology() {
        let topo = CacheTopology::default();
        assert_eq!(topo.line_size, 64);
        assert_eq!(topo.l1.size, 32 * KIB);
        assert_eq!(topo.l2.ways, 8);
        assert!(topo.l3.shared);
        assert_eq!(topo.ram_probe_size(), Some(64 * MIB));

        let mut huge = CacheTopology::default();
        huge.l3.size = 1 << 63;
        assert_eq!(huge.ram_probe_size(), None);
        assert_eq!(topo.levels().map(|l| l.name.as_str()), ["L1", "L2", "L3"]);
    }

    #[test]
    fn test_labels() {
        let topo = CacheTopology::default();
        assert_eq!(topo.l1.label(), "L1 (32KB)");
        assert_eq!(topo.l2.label(), "L2 (512KB)");
        assert_eq!(topo.l3.label(), "L3 (32MB)");
    }

    #[test]
    fn test_size_formatting() {
        assert_eq!(spaced_size(512), "512 B");
        assert_eq!(spaced_size(4 * KIB), "4 KB");
        assert_eq!(spaced_size(128 * MIB), "128 MB");
        assert_eq!(compact_size(6 * MIB), "6MB");
    }
}
