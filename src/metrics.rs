//! Observability sinks for the rule trie.
//!
//! The trie reports its fanout distribution into the shared context when a
//! rewrite system is torn down. The histograms are purely diagnostic; nothing
//! in the rewrite core reads them back.

use std::fmt;

/// Bucket count past which values are lumped into a single overflow bucket.
const MAX_BUCKETS: usize = 64;

/// A histogram of small non-negative values.
///
/// Bucket `v` counts how many times `record(v)` was called. Values at or
/// above `MAX_BUCKETS` land in the overflow bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Histogram {
    buckets: Vec<u64>,
    overflow: u64,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `value`.
    pub fn record(&mut self, value: usize) {
        if value >= MAX_BUCKETS {
            self.overflow += 1;
            return;
        }
        if self.buckets.len() <= value {
            self.buckets.resize(value + 1, 0);
        }
        self.buckets[value] += 1;
    }

    /// Total number of recorded samples.
    pub fn total(&self) -> u64 {
        self.buckets.iter().sum::<u64>() + self.overflow
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total();
        for (value, &count) in self.buckets.iter().enumerate() {
            if count == 0 {
                continue;
            }
            writeln!(
                f,
                "{:>4}: {} ({:.1}%)",
                value,
                count,
                count as f64 / total as f64 * 100.0
            )?;
        }
        if self.overflow > 0 {
            writeln!(
                f,
                ">={}: {} ({:.1}%)",
                MAX_BUCKETS,
                self.overflow,
                self.overflow as f64 / total as f64 * 100.0
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/metrics.rs"]
mod tests;
