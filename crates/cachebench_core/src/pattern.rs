//! Addressing patterns the kernels walk a buffer with.

use rand::Rng;
use std::mem;

/// Granularity of random offsets.
pub const WORD_SIZE: usize = mem::size_of::<usize>();

/// How a kernel walks a buffer. Immutable once a kernel starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPattern {
    /// Loads at `0, line, 2*line, ...`.
    Sequential { line_size: usize },
    /// Loads at precomputed word-aligned offsets, drawn with replacement.
    Random { offsets: Vec<usize> },
    /// Loads at `0, stride, 2*stride, ...` for an arbitrary stride.
    Strided { stride: usize },
    /// Stores at `0, line, 2*line, ...`.
    SequentialWrite { line_size: usize },
    /// Loads at `ways + 1` addresses spaced `stride` apart.
    AssociativityProbe { stride: usize, ways: usize },
}

impl AccessPattern {
    pub fn sequential(line_size: usize) -> Self {
        assert!(line_size > 0, "line size must be non-zero");
        Self::Sequential { line_size }
    }

    /// `size / WORD_SIZE` offsets, each drawn uniformly from the word-aligned
    /// offsets of a `size`-byte buffer. Repeats are kept.
    pub fn random<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Self {
        let words = size / WORD_SIZE;
        let offsets = (0..words)
            .map(|_| rng.gen_range(0..words) * WORD_SIZE)
            .collect();
        Self::Random { offsets }
    }

    pub fn strided(stride: usize) -> Self {
        assert!(stride > 0, "stride must be non-zero");
        Self::Strided { stride }
    }

    pub fn sequential_write(line_size: usize) -> Self {
        assert!(line_size > 0, "line size must be non-zero");
        Self::SequentialWrite { line_size }
    }

    /// Probe a cache of `capacity` bytes presumed `ways`-way associative.
    /// Every probed address maps to the same set.
    pub fn associativity_probe(capacity: usize, ways: usize) -> Self {
        assert!(ways > 0, "associativity must be non-zero");
        let stride = capacity / ways;
        assert!(stride > 0, "capacity smaller than associativity");
        Self::AssociativityProbe { stride, ways }
    }

    /// Buffer size an associativity probe for `capacity` runs over, or
    /// `None` if it does not fit in `usize`.
    pub fn probe_buffer_size(capacity: usize) -> Option<usize> {
        capacity.checked_mul(2)
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Self::SequentialWrite { .. })
    }

    /// Largest offset one pass over a `size`-byte buffer touches, if any.
    pub fn max_offset(&self, size: usize) -> Option<usize> {
        match self {
            Self::Sequential { line_size: step }
            | Self::SequentialWrite { line_size: step }
            | Self::Strided { stride: step } => {
                if size == 0 {
                    None
                } else {
                    Some((size - 1) / step * step)
                }
            }
            Self::Random { offsets } => offsets.iter().copied().max(),
            Self::AssociativityProbe { stride, ways } => Some(ways * stride),
        }
    }

    /// Visit every offset of one pass, in order.
    #[inline(always)]
    pub fn for_each_offset<F: FnMut(usize)>(&self, size: usize, mut f: F) {
        match self {
            Self::Sequential { line_size: step }
            | Self::SequentialWrite { line_size: step }
            | Self::Strided { stride: step } => {
                let mut offset = 0;
                while offset < size {
                    f(offset);
                    offset += step;
                }
            }
            Self::Random { offsets } => {
                for &offset in offsets {
                    f(offset);
                }
            }
            Self::AssociativityProbe { stride, ways } => {
                for w in 0..=*ways {
                    f(w * stride);
                }
            }
        }
    }
}
