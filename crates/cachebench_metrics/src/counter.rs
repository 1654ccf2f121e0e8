//! Per-offset access counts for instrumented kernels

use std::collections::HashMap;

/// Records every buffer offset a kernel would touch, in visit order.
#[derive(Debug, Default, Clone)]
pub struct AccessCounter {
    hits: HashMap<usize, usize>,
    sequence: Vec<usize>,
}

impl AccessCounter {
    pub fn new() -> Self {
        Self {
            hits: HashMap::new(),
            sequence: Vec::new(),
        }
    }

    pub fn record(&mut self, offset: usize) {
        *self.hits.entry(offset).or_insert(0) += 1;
        self.sequence.push(offset);
    }

    /// Total accesses recorded, duplicates included.
    pub fn total(&self) -> usize {
        self.sequence.len()
    }

    /// Number of distinct offsets touched.
    pub fn distinct(&self) -> usize {
        self.hits.len()
    }

    pub fn max_offset(&self) -> Option<usize> {
        self.hits.keys().copied().max()
    }

    pub fn sequence(&self) -> &[usize] {
        &self.sequence
    }
}
