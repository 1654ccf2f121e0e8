//! Timed memory-access kernels.
//!
//! Every kernel reads the clock, makes `iterations` passes over a buffer
//! under an [`AccessPattern`], reads the clock again and returns the
//! difference in milliseconds. Loads and stores inside the timed loop are
//! volatile, and the loaded bytes are folded into a sink handed to
//! [`black_box`], so the optimizer can neither drop nor hoist them.
//!
//! [`count`] walks the identical traversal without touching memory, for
//! checking what a kernel would visit.

use crate::buffer::{AlignedBuffer, AllocError};
use crate::pattern::AccessPattern;
use cachebench_metrics::{AccessCounter, Clock};
use rand::Rng;
use std::hint::black_box;
use std::ptr;

/// Time `iterations` passes of `pattern` over `buffer`.
///
/// Panics if the pattern reaches outside the buffer; patterns are built for
/// the buffer they run on.
pub fn run<C: Clock>(
    clock: &C,
    buffer: &mut AlignedBuffer,
    pattern: &AccessPattern,
    iterations: u32,
) -> f64 {
    let size = buffer.len();
    if let Some(max) = pattern.max_offset(size) {
        assert!(
            max < size,
            "pattern offset {max} outside {size}-byte buffer"
        );
    }

    if pattern.is_write() {
        let base = buffer.as_mut_ptr();
        let (elapsed, ()) = clock.time(|| {
            for i in 0..iterations {
                pattern.for_each_offset(size, |offset| {
                    // SAFETY: offset < size, checked against max_offset above.
                    unsafe {
                        ptr::write_volatile(base.add(offset), (i as usize + offset) as u8);
                    }
                });
            }
        });
        black_box(base);
        elapsed
    } else {
        let base = buffer.as_ptr();
        let (elapsed, sink) = clock.time(|| {
            let mut sink = 0u8;
            for _ in 0..iterations {
                pattern.for_each_offset(size, |offset| {
                    // SAFETY: offset < size, checked against max_offset above.
                    let byte = unsafe { ptr::read_volatile(base.add(offset)) };
                    sink = sink.wrapping_add(byte);
                });
            }
            sink
        });
        black_box(sink);
        elapsed
    }
}

/// Record the offsets `iterations` passes of `pattern` over a `size`-byte
/// buffer would touch, without timing or touching memory.
pub fn count(pattern: &AccessPattern, size: usize, iterations: u32) -> AccessCounter {
    let mut counter = AccessCounter::new();
    for _ in 0..iterations {
        pattern.for_each_offset(size, |offset| counter.record(offset));
    }
    counter
}

pub fn sequential_read<C: Clock>(
    clock: &C,
    buffer: &mut AlignedBuffer,
    line_size: usize,
    iterations: u32,
) -> f64 {
    run(clock, buffer, &AccessPattern::sequential(line_size), iterations)
}

/// Random loads; offset generation happens before the clock starts.
///
/// Equivalent to [`run`] over [`AccessPattern::random`], so a fixed seed
/// yields the offset sequence [`count`] reports for that pattern.
pub fn random_read<C: Clock, R: Rng + ?Sized>(
    clock: &C,
    buffer: &mut AlignedBuffer,
    rng: &mut R,
    iterations: u32,
) -> f64 {
    let pattern = AccessPattern::random(buffer.len(), rng);
    run(clock, buffer, &pattern, iterations)
}

pub fn strided_read<C: Clock>(
    clock: &C,
    buffer: &mut AlignedBuffer,
    stride: usize,
    iterations: u32,
) -> f64 {
    run(clock, buffer, &AccessPattern::strided(stride), iterations)
}

pub fn sequential_write<C: Clock>(
    clock: &C,
    buffer: &mut AlignedBuffer,
    line_size: usize,
    iterations: u32,
) -> f64 {
    run(clock, buffer, &AccessPattern::sequential_write(line_size), iterations)
}

/// Probe a presumed `ways`-way cache of `capacity` bytes. Allocates its own
/// `2 * capacity` buffer, which is released before returning. A buffer size
/// that overflows `usize` is reported as [`AllocError::InvalidLayout`].
pub fn associativity_probe<C: Clock>(
    clock: &C,
    capacity: usize,
    ways: usize,
    alignment: usize,
    fill: u8,
    iterations: u32,
) -> Result<f64, AllocError> {
    let pattern = AccessPattern::associativity_probe(capacity, ways);
    let size = AccessPattern::probe_buffer_size(capacity).ok_or(AllocError::InvalidLayout {
        size: capacity,
        alignment,
    })?;
    let mut buffer = AlignedBuffer::allocate_filled(size, alignment, fill)?;
    Ok(run(clock, &mut buffer, &pattern, iterations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PAGE_SIZE;
    use crate::pattern::WORD_SIZE;
    use cachebench_metrics::{efficiency_percent, thrashing_factor, MonotonicClock};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const LINE: usize = 64;

    fn filled(size: usize) -> AlignedBuffer {
        AlignedBuffer::allocate_filled(size, PAGE_SIZE, 0xAA).unwrap()
    }

    #[test]
    fn test_sequential_visits_each_line_once_per_pass() {
        for size in [4096, 4096 + 1, 100, 64, 1] {
            let counter = count(&AccessPattern::sequential(LINE), size, 3);
            let lines = size.div_ceil(LINE);
            assert_eq!(counter.distinct(), lines, "size {size}");
            assert_eq!(counter.total(), lines * 3, "size {size}");
            assert!(counter.max_offset().unwrap() < size);
        }
    }

    #[test]
    fn test_filled_buffer_round_trip_through_sequential_kernel() {
        let size = 10 * 1024 + 5;
        let mut buffer = filled(size);
        assert!(buffer.as_slice().iter().all(|&b| b == 0xAA));

        let counter = count(&AccessPattern::sequential(LINE), buffer.len(), 1);
        assert_eq!(counter.total(), size.div_ceil(LINE));

        let clock = MonotonicClock::new();
        let elapsed = sequential_read(&clock, &mut buffer, LINE, 1);
        assert!(elapsed >= 0.0);
        // Reads leave the fill intact.
        assert!(buffer.as_slice().iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_write_kernel_stores_index_derived_values() {
        let mut buffer = filled(256);
        let clock = MonotonicClock::new();
        sequential_write(&clock, &mut buffer, LINE, 1);

        let bytes = buffer.as_slice();
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[64], 64);
        assert_eq!(bytes[128], 128);
        assert_eq!(bytes[192], 192);
        // Untouched bytes keep the fill.
        assert_eq!(bytes[1], 0xAA);
    }

    #[test]
    fn test_random_pattern_deterministic_for_seed() {
        let size = 64 * 1024;
        let a = AccessPattern::random(size, &mut StdRng::seed_from_u64(42));
        let b = AccessPattern::random(size, &mut StdRng::seed_from_u64(42));
        let c = AccessPattern::random(size, &mut StdRng::seed_from_u64(43));

        let ta = count(&a, size, 2);
        let tb = count(&b, size, 2);
        assert_eq!(ta.sequence(), tb.sequence());
        assert_ne!(ta.sequence(), count(&c, size, 2).sequence());
        assert_eq!(ta.total(), 2 * size / WORD_SIZE);
    }

    #[test]
    fn test_accesses_are_not_optimized_away() {
        let mut buffer = filled(8 * 1024 * 1024);
        let clock = MonotonicClock::new();
        let elapsed = sequential_read(&clock, &mut buffer, LINE, 20);
        assert!(elapsed > 0.0, "sequential read measured zero time");

        let elapsed = sequential_write(&clock, &mut buffer, LINE, 20);
        assert!(elapsed > 0.0, "sequential write measured zero time");
    }

    #[test]
    fn test_elapsed_grows_with_iterations() {
        let mut buffer = filled(1024 * 1024);
        let clock = MonotonicClock::new();
        let few = sequential_read(&clock, &mut buffer, LINE, 2);
        let many = sequential_read(&clock, &mut buffer, LINE, 200);
        assert!(many >= few, "200 passes {many} ms < 2 passes {few} ms");
    }

    #[test]
    fn test_random_not_faster_than_sequential_beyond_l1() {
        // 8x the assumed 32 KB L1.
        let mut buffer = filled(256 * 1024);
        let clock = MonotonicClock::new();
        let mut rng = StdRng::seed_from_u64(9);
        let seq = sequential_read(&clock, &mut buffer, LINE, 50);
        let rand = random_read(&clock, &mut buffer, &mut rng, 50);
        assert!(rand >= seq, "random {rand} ms < sequential {seq} ms");
    }

    #[test]
    fn test_wider_stride_not_slower() {
        let mut buffer = filled(4 * 1024 * 1024);
        let clock = MonotonicClock::new();
        let baseline = strided_read(&clock, &mut buffer, 1, 2);
        let line = strided_read(&clock, &mut buffer, LINE, 20);
        let double = strided_read(&clock, &mut buffer, 2 * LINE, 20);
        assert!(
            efficiency_percent(baseline, double) >= efficiency_percent(baseline, line),
            "stride {} took {double} ms, stride {LINE} took {line} ms",
            2 * LINE
        );
    }

    #[test]
    fn test_over_associative_probe_thrashes() {
        let clock = MonotonicClock::new();
        let at = associativity_probe(&clock, 32 * 1024, 8, PAGE_SIZE, 0, 100_000).unwrap();
        let over = associativity_probe(&clock, 32 * 1024, 16, PAGE_SIZE, 0, 100_000).unwrap();
        assert!(at > 0.0);
        assert!(thrashing_factor(at, over) >= 1.0, "at {at} ms, over {over} ms");
    }

    #[test]
    fn test_probe_allocation_failure_is_reported() {
        let clock = MonotonicClock::new();
        let err = associativity_probe(&clock, 1 << 59, 8, PAGE_SIZE, 0, 1).unwrap_err();
        assert!(matches!(err, AllocError::OutOfMemory { .. }));

        // 2 * capacity overflows usize.
        let err = associativity_probe(&clock, 1 << 63, 16, PAGE_SIZE, 0, 1).unwrap_err();
        assert_eq!(
            err,
            AllocError::InvalidLayout {
                size: 1 << 63,
                alignment: PAGE_SIZE
            }
        );
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_pattern_outside_buffer_panics() {
        let mut buffer = filled(4096);
        let pattern = AccessPattern::associativity_probe(4096, 1);
        run(&MonotonicClock::new(), &mut buffer, &pattern, 1);
    }
}
