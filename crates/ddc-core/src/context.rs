//! A single value bundling everything the exchange/retry/multi-part layers
//! need, threaded explicitly through every call rather than hidden behind
//! module-level statics (spec.md §9).

use crate::retry::{RetryMaxima, RetryStats};
use crate::sleep::{SleepStats, SleepTable};

/// Which low-level mechanism an I2C transport uses to perform a write-read
/// exchange. Only `ddc-i2c` interprets this; it lives on [`Context`] rather
/// than buried in that crate because it is a process-wide, user-overridable
/// setting like the sleep table and retry maxima (spec.md §9).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IoStrategy {
    /// Plain `read`/`write` on the device node, with the host sleeping
    /// between them itself.
    FileIo,
    /// A single `I2C_RDWR` ioctl combining the write and read, letting the
    /// kernel driver manage timing.
    Ioctl,
}

impl Default for IoStrategy {
    fn default() -> Self {
        IoStrategy::FileIo
    }
}

/// Process-wide (but explicitly threaded, not global) tunables and counters.
///
/// A single `Context` is typically constructed once per process and shared
/// by reference across every open display handle.
#[derive(Default)]
pub struct Context {
    pub sleep_table: SleepTable,
    pub sleep_stats: SleepStats,
    pub retry_maxima: RetryMaxima,
    pub retry_stats: RetryStats,
    pub io_strategy: IoStrategy,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every accumulating statistic (sleep and retry) without
    /// touching the tunables (sleep table, retry maxima, I/O strategy).
    pub fn reset_stats(&self) {
        self.sleep_stats.reset();
        self.retry_stats.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_io_strategy_is_file_io() {
        let ctx = Context::new();
        assert_eq!(ctx.io_strategy, IoStrategy::FileIo);
    }

    #[test]
    fn reset_stats_clears_counters_only() {
        let ctx = Context::new();
        ctx.retry_stats.reset();
        ctx.sleep_stats.reset();
        ctx.reset_stats();
        assert_eq!(ctx.sleep_stats.total_calls(), 0);
    }
}
