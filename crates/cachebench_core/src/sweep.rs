//! Sweep drivers.
//!
//! Each driver owns one experiment: walk a sequence of sizes, strides or
//! cache levels, allocate a fresh buffer per step, run its kernels, print one
//! row and drop the buffer before the next step. A failed allocation prints a
//! diagnostic in place of the row and the sweep carries on.

use crate::buffer::{AlignedBuffer, AllocError};
use crate::config::{BenchConfig, ConfigError};
use crate::kernel;
use crate::report::{self, Table};
use crate::topology::{compact_size, spaced_size};
use cachebench_metrics::{bandwidth_gbs, efficiency_percent, ratio, thrashing_factor, Clock};
use rand::Rng;
use std::io::{self, Write};
use tracing::{debug, info, warn};

/// Runs the benchmark suite against one configuration, writing to `out`.
pub struct Harness<C, R, W> {
    config: BenchConfig,
    clock: C,
    rng: R,
    out: W,
}

impl<C: Clock, R: Rng, W: Write> Harness<C, R, W> {
    /// Fails if `config` does not pass [`BenchConfig::validate`]; every sweep
    /// relies on a validated configuration.
    pub fn new(config: BenchConfig, clock: C, rng: R, out: W) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            rng,
            out,
        })
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Every sweep in fixed order, framed by the hierarchy banner and the
    /// closing analysis.
    pub fn run_all(&mut self) -> io::Result<()> {
        report::print_banner(&mut self.out, &self.config.topology)?;
        report::print_hierarchy(&mut self.out, &self.config.topology)?;
        writeln!(self.out, "Running benchmarks... (this may take a few minutes)")?;
        writeln!(self.out)?;

        self.latency_sweep()?;
        self.stride_sweep()?;
        self.thrashing_sweep()?;
        self.read_write_sweep()?;
        self.detailed_l3_sweep()?;

        report::print_analysis(&mut self.out, &self.config.topology)?;
        self.out.flush()
    }

    /// Sequential vs random loads over doubling buffer sizes.
    pub fn latency_sweep(&mut self) -> io::Result<()> {
        let Self {
            config,
            clock,
            rng,
            out,
        } = self;
        let line = config.topology.line_size;
        info!(min_size = config.min_size, max_size = config.max_size, "latency sweep");

        let mut table = Table::begin(
            out,
            "Memory Latency Test",
            &[],
            &["Size", "Sequential (ms)", "Random (ms)", "Bandwidth (GB/s)"],
        )?;

        for size in config.latency_sizes() {
            let mut buffer = match allocate(config, size) {
                Ok(buffer) => buffer,
                Err(err) => {
                    skip(&mut table, &format!("{} bytes", size), &err)?;
                    continue;
                }
            };
            let iterations = config.scaled_iterations(size, config.min_iterations);
            debug!(size, iterations, "latency step");

            let seq_ms = kernel::sequential_read(&*clock, &mut buffer, line, iterations);
            let rand_ms = kernel::random_read(&*clock, &mut buffer, &mut *rng, iterations);
            let bytes = size as u64 * u64::from(iterations);

            table.row(&[
                spaced_size(size),
                format!("{:.2}", seq_ms),
                format!("{:.2}", rand_ms),
                format!("{:.2}", bandwidth_gbs(bytes, seq_ms)),
            ])?;
        }
        table.finish()
    }

    /// Strided loads over one buffer; efficiency is relative to stride 1.
    pub fn stride_sweep(&mut self) -> io::Result<()> {
        let Self {
            config, clock, out, ..
        } = self;
        let size = config.stride_buffer_size;
        let iterations = (config.base_iterations / 100).max(1);
        info!(size, iterations, "stride sweep");

        let note = format!("Testing with {} buffer", compact_size(size));
        let mut table = Table::begin(
            out,
            "Cache Line Stride Test",
            &[&note],
            &["Stride", "Time (ms)", "Efficiency"],
        )?;

        let mut buffer = match allocate(config, size) {
            Ok(buffer) => buffer,
            Err(err) => {
                skip(&mut table, "buffer", &err)?;
                return table.finish();
            }
        };

        let baseline = kernel::strided_read(&*clock, &mut buffer, 1, iterations);
        for &stride in &config.strides {
            debug!(stride, "stride step");
            let ms = kernel::strided_read(&*clock, &mut buffer, stride, iterations);
            table.row(&[
                stride.to_string(),
                format!("{:.2}", ms),
                format!("{:.1}%", efficiency_percent(baseline, ms)),
            ])?;
        }
        drop(buffer);
        table.finish()
    }

    /// Associativity probes at each level's ways and at twice that.
    pub fn thrashing_sweep(&mut self) -> io::Result<()> {
        let Self {
            config, clock, out, ..
        } = self;
        let iterations = (config.base_iterations / 10).max(1);
        info!(iterations, "thrashing sweep");

        let mut table = Table::begin(
            out,
            "Cache Thrashing Test",
            &["Testing cache associativity limits"],
            &["Cache Level", "Time (ms)", "Thrashing Factor"],
        )?;

        for level in config.topology.levels() {
            let label = level.label();
            let probe = |ways: usize| {
                kernel::associativity_probe(
                    &*clock,
                    level.size,
                    ways,
                    config.alignment,
                    config.fill_byte,
                    iterations,
                )
            };
            debug!(level = %label, ways = level.ways, "thrashing step");

            let over_ways = level.ways.checked_mul(2).ok_or(AllocError::InvalidLayout {
                size: level.size,
                alignment: config.alignment,
            });
            let measured = over_ways
                .and_then(|over| Ok((probe(level.ways)?, probe(over)?)));
            match measured {
                Ok((at_ms, over_ms)) => table.row(&[
                    label,
                    format!("{:.2}", at_ms),
                    format!("{:.2}x", thrashing_factor(at_ms, over_ms)),
                ])?,
                Err(err) => skip(
                    &mut table,
                    &format!("memory for associativity test ({})", label),
                    &err,
                )?,
            }
        }
        table.finish()
    }

    /// Sequential loads vs sequential stores at each cache level and in RAM.
    pub fn read_write_sweep(&mut self) -> io::Result<()> {
        let Self {
            config, clock, out, ..
        } = self;
        let topology = &config.topology;
        let line = topology.line_size;
        info!("read/write sweep");

        let ram = topology.ram_probe_size();
        let steps = [
            (topology.l1.label(), Some(topology.l1.size)),
            (topology.l2.label(), Some(topology.l2.size)),
            (topology.l3.label(), Some(topology.l3.size)),
            (
                ram.map_or_else(|| "RAM".to_string(), |ram| format!("RAM ({})", compact_size(ram))),
                ram,
            ),
        ];

        let mut table = Table::begin(
            out,
            "Read vs Write Performance",
            &[],
            &["Size", "Read (ms)", "Write (ms)", "Write/Read Ratio"],
        )?;

        for (label, size) in steps {
            let Some(size) = size else {
                let err = AllocError::InvalidLayout {
                    size: topology.l3.size,
                    alignment: config.alignment,
                };
                skip(&mut table, &label, &err)?;
                continue;
            };
            let mut buffer = match allocate(config, size) {
                Ok(buffer) => buffer,
                Err(err) => {
                    skip(&mut table, &label, &err)?;
                    continue;
                }
            };
            let iterations = config.scaled_iterations(size, config.min_iterations);
            debug!(size, iterations, "read/write step");

            let read_ms = kernel::sequential_read(&*clock, &mut buffer, line, iterations);
            let write_ms = kernel::sequential_write(&*clock, &mut buffer, line, iterations);
            table.row(&[
                label,
                format!("{:.2}", read_ms),
                format!("{:.2}", write_ms),
                format!("{:.2}", ratio(write_ms, read_ms)),
            ])?;
        }
        table.finish()
    }

    /// Fine-grained sizes around the last-level boundary, as ratios against
    /// the first size that could be measured.
    pub fn detailed_l3_sweep(&mut self) -> io::Result<()> {
        let Self {
            config,
            clock,
            rng,
            out,
        } = self;
        let line = config.topology.line_size;
        info!(steps = config.detail_sizes.len(), "detailed L3 sweep");

        let mut table = Table::begin(
            out,
            "Detailed L3 Cache Investigation",
            &["Testing fine-grained sizes around L3 boundaries"],
            &["Size", "Seq (ms)", "Rand (ms)", "Latency Ratio"],
        )?;

        let mut baseline: Option<(f64, f64)> = None;
        for &size in &config.detail_sizes {
            let label = compact_size(size);
            let mut buffer = match allocate(config, size) {
                Ok(buffer) => buffer,
                Err(err) => {
                    skip(&mut table, &label, &err)?;
                    continue;
                }
            };
            let iterations = config.scaled_iterations(size, config.detail_min_iterations);
            debug!(size, iterations, "detailed L3 step");

            let seq_ms = kernel::sequential_read(&*clock, &mut buffer, line, iterations);
            let rand_ms = kernel::random_read(&*clock, &mut buffer, &mut *rng, iterations);
            let (base_seq, base_rand) = *baseline.get_or_insert((seq_ms, rand_ms));

            table.row(&[
                label,
                format!("{:.2}", seq_ms),
                format!("{:.2}", rand_ms),
                format!(
                    "{:.2}x/{:.2}x",
                    ratio(seq_ms, base_seq),
                    ratio(rand_ms, base_rand)
                ),
            ])?;
        }
        table.finish()
    }
}

fn allocate(config: &BenchConfig, size: usize) -> Result<AlignedBuffer, AllocError> {
    AlignedBuffer::allocate_filled(size, config.alignment, config.fill_byte)
}

fn skip<W: Write>(table: &mut Table<'_, W>, what: &str, err: &AllocError) -> io::Result<()> {
    warn!(error = %err, "skipping step: failed to allocate {}", what);
    table.note(&format!("Failed to allocate {}", what))
}
