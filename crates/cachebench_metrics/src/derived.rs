//! Metrics derived from one or two kernel measurements

/// Bytes per GiB, the unit bandwidth is reported in.
pub const BYTES_PER_GIB: f64 = (1u64 << 30) as f64;

/// Aggregate bandwidth in GB/s (2^30 bytes) for `bytes` moved in `elapsed_ms`.
pub fn bandwidth_gbs(bytes: u64, elapsed_ms: f64) -> f64 {
    if elapsed_ms > 0.0 {
        bytes as f64 / (elapsed_ms / 1000.0) / BYTES_PER_GIB
    } else {
        0.0
    }
}

/// `value / baseline`, e.g. slowdown against the first step of a sweep.
pub fn ratio(value: f64, baseline: f64) -> f64 {
    if baseline > 0.0 {
        value / baseline
    } else {
        0.0
    }
}

/// Baseline time over current time, as a percentage.
pub fn efficiency_percent(baseline: f64, current: f64) -> f64 {
    ratio(baseline, current) * 100.0
}

/// Slowdown of an over-associative probe relative to the at-capacity probe.
pub fn thrashing_factor(at_capacity: f64, over_capacity: f64) -> f64 {
    ratio(over_capacity, at_capacity)
}
