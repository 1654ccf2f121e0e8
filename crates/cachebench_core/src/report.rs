//! Plain-text report output: tables, hierarchy banner, closing analysis.

use crate::topology::{compact_size, CacheTopology};
use std::io::{self, Write};

/// A tab-separated table: title, header, dash separator, rows, blank line.
pub struct Table<'w, W: Write> {
    out: &'w mut W,
}

impl<'w, W: Write> Table<'w, W> {
    /// Write the title lines and header, returning a table to add rows to.
    pub fn begin(
        out: &'w mut W,
        title: &str,
        notes: &[&str],
        columns: &[&str],
    ) -> io::Result<Self> {
        writeln!(out, "=== {} ===", title)?;
        for note in notes {
            writeln!(out, "{}", note)?;
        }
        let header = columns.join("\t\t");
        writeln!(out, "{}", header)?;
        writeln!(out, "{}", "-".repeat(separator_width(&header)))?;
        Ok(Self { out })
    }

    pub fn row(&mut self, cells: &[String]) -> io::Result<()> {
        writeln!(self.out, "{}", cells.join("\t\t"))
    }

    /// A free-form line inside the table, e.g. an allocation failure.
    pub fn note(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.out, "{}", line)
    }

    pub fn finish(self) -> io::Result<()> {
        writeln!(self.out)
    }
}

// Tabs render at 8 columns.
fn separator_width(header: &str) -> usize {
    header
        .chars()
        .fold(0, |col, c| if c == '\t' { (col / 8 + 1) * 8 } else { col + 1 })
}

pub fn print_banner<W: Write>(out: &mut W, topology: &CacheTopology) -> io::Result<()> {
    writeln!(out, "CPU Cache Benchmark Tool")?;
    writeln!(out, "Configured for {}", topology.model)?;
    writeln!(out, "{}", "=".repeat(24))?;
    writeln!(out)
}

pub fn print_hierarchy<W: Write>(out: &mut W, topology: &CacheTopology) -> io::Result<()> {
    let title = format!("=== {} Cache Hierarchy ===", topology.model);
    writeln!(out, "{}", title)?;
    for level in topology.levels() {
        let scope = if level.shared { "shared" } else { "per core" };
        let kind = if level.name == "L1" { " Data" } else { "" };
        writeln!(
            out,
            "{}{} Cache: {} {} ({}-way associative)",
            level.name,
            kind,
            compact_size(level.size),
            scope,
            level.ways
        )?;
    }
    writeln!(out, "Cache Line Size: {} bytes", topology.line_size)?;
    writeln!(out, "{}", "=".repeat(title.chars().count()))?;
    writeln!(out)
}

/// Closing interpretation. Static text keyed to the configured topology; it
/// describes what the tables are expected to show, not what they showed.
pub fn print_analysis<W: Write>(out: &mut W, topology: &CacheTopology) -> io::Result<()> {
    let l1 = compact_size(topology.l1.size);
    let l2 = compact_size(topology.l2.size);
    let l3 = compact_size(topology.l3.size);
    let line = topology.line_size;

    writeln!(out, "=== Performance Analysis ===")?;
    writeln!(out, "How to read the results:")?;
    writeln!(out)?;

    writeln!(out, "* L1 Cache (up to {}):", l1)?;
    writeln!(out, "  - Expected latency ~1 ns (4-5 cycles)")?;
    writeln!(out, "  - Flat sequential and random times up to {} confirm the L1 size", l1)?;
    writeln!(out)?;

    writeln!(out, "* L2 Cache ({}-{}):", l1, l2)?;
    writeln!(out, "  - Expected latency ~3-4 ns (12-14 cycles)")?;
    writeln!(out, "  - Sequential access barely degrades; random access slows slightly")?;
    writeln!(out)?;

    writeln!(out, "* L3 Cache ({}-{}):", l2, l3)?;
    writeln!(out, "  - Expected latency ~10-15 ns (40-50 cycles)")?;
    writeln!(out, "  - The effective boundary may sit below {} when the cache", l3)?;
    writeln!(out, "    is partitioned between cores or shared with other processes")?;
    writeln!(out)?;

    writeln!(out, "* RAM (beyond {}):", l3)?;
    writeln!(out, "  - Expected latency ~60-100 ns")?;
    writeln!(out, "  - Random access ratios jump sharply; sequential access is")?;
    writeln!(out, "    carried by the hardware prefetcher")?;
    writeln!(out)?;

    writeln!(out, "* Cache Line:")?;
    writeln!(out, "  - Stride efficiency should change slope at {} bytes", line)?;
    writeln!(out, "  - Beyond that stride every access touches a new line")?;
    writeln!(out)?;

    writeln!(out, "* Optimization Insights:")?;
    writeln!(out, "  - Keep hot data within the measured L3 boundary")?;
    writeln!(out, "  - Use {}-byte aligned data structures", line)?;
    writeln!(out, "  - Prefer sequential traversal; random access is several times slower")?;
    writeln!(out, "  - Cache-conscious algorithms matter above {}", l2)?;
    writeln!(out, "================================")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_table_layout() {
        let text = render(|out| {
            let mut table = Table::begin(out, "Demo", &["one note"], &["Size", "Time (ms)"])?;
            table.row(&["4 KB".to_string(), "1.00".to_string()])?;
            table.note("Failed to allocate 8 KB")?;
            table.finish()
        });

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "=== Demo ===");
        assert_eq!(lines[1], "one note");
        assert_eq!(lines[2], "Size\t\tTime (ms)");
        assert!(!lines[3].is_empty());
        assert!(lines[3].chars().all(|c| c == '-'));
        assert_eq!(lines[4], "4 KB\t\t1.00");
        assert_eq!(lines[5], "Failed to allocate 8 KB");
        assert!(text.ends_with("\n\n"));
    }

    #[test]
    fn test_separator_width_expands_tabs() {
        assert_eq!(separator_width("Size"), 4);
        assert_eq!(separator_width("Size\t\tX"), 17);
    }

    #[test]
    fn test_hierarchy_describes_topology() {
        let text = render(|out| print_hierarchy(out, &CacheTopology::default()));
        assert!(text.contains("AMD Ryzen 5600 Cache Hierarchy"));
        assert!(text.contains("L1 Data Cache: 32KB per core (8-way associative)"));
        assert!(text.contains("L2 Cache: 512KB per core (8-way associative)"));
        assert!(text.contains("L3 Cache: 32MB shared (16-way associative)"));
        assert!(text.contains("Cache Line Size: 64 bytes"));
    }

    #[test]
    fn test_analysis_follows_topology() {
        let mut topo = CacheTopology::default();
        topo.l2.size = 1024 * 1024;
        topo.line_size = 128;
        let text = render(|out| print_analysis(out, &topo));
        assert!(text.contains("L2 Cache (32KB-1MB)"));
        assert!(text.contains("128 bytes"));
        assert!(text.contains("Use 128-byte aligned"));
    }
}
