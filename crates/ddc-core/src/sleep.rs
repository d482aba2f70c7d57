//! Post-operation sleep phases (spec.md §4.1) and the process-wide sleep
//! statistics (§3, §5c).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::transport::TransportKind;

/// The closed set of moments the exchange engine sleeps at.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SleepPhase {
    PostOpen,
    WriteToRead,
    PostRead,
    PostWrite,
    CapabilitiesRetry,
    TableRetry,
}

impl SleepPhase {
    /// Literature default for this phase on the given transport, in the
    /// 40-200ms range spec.md §4.1 calls out.
    pub fn default_duration(self, transport: TransportKind) -> Duration {
        use SleepPhase::*;
        use TransportKind::*;
        let ms = match (self, transport) {
            (PostOpen, I2c) => 100,
            (PostOpen, Adapter) => 60,
            (PostOpen, Usb) => 60,
            (WriteToRead, I2c) => 40,
            (WriteToRead, Adapter) => 50,
            (WriteToRead, Usb) => 50,
            (PostRead, I2c) => 40,
            (PostRead, Adapter) => 40,
            (PostRead, Usb) => 40,
            (PostWrite, I2c) => 50,
            (PostWrite, Adapter) => 50,
            (PostWrite, Usb) => 50,
            (CapabilitiesRetry, I2c) => 200,
            (CapabilitiesRetry, Adapter) => 150,
            (CapabilitiesRetry, Usb) => 150,
            (TableRetry, I2c) => 200,
            (TableRetry, Adapter) => 150,
            (TableRetry, Usb) => 150,
        };
        Duration::from_millis(ms)
    }
}

/// A tunable table of phase durations, keyed by `(phase, transport)`.
///
/// Process-wide and mutable at any time (spec.md §5b); changes take effect
/// on the next exchange. Lives inside [`crate::context::Context`] rather
/// than a module-level static, per the design note in spec.md §9.
#[derive(Clone, Debug)]
pub struct SleepTable {
    overrides: HashMap<(SleepPhase, TransportKind), Duration>,
}

impl Default for SleepTable {
    fn default() -> Self {
        SleepTable {
            overrides: HashMap::new(),
        }
    }
}

impl SleepTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the duration for a specific `(phase, transport)` pair.
    pub fn set(&mut self, phase: SleepPhase, transport: TransportKind, duration: Duration) {
        self.overrides.insert((phase, transport), duration);
    }

    /// The duration in effect for `phase` on `transport`: an override if
    /// one was set, otherwise the literature default.
    pub fn duration(&self, phase: SleepPhase, transport: TransportKind) -> Duration {
        self.overrides
            .get(&(phase, transport))
            .copied()
            .unwrap_or_else(|| phase.default_duration(transport))
    }
}

/// Process-wide, monotonically-accumulating sleep counters (spec.md §3).
#[derive(Debug, Default)]
pub struct SleepStats {
    calls: AtomicU64,
    requested_ms: AtomicU64,
    elapsed_ns: AtomicU64,
}

impl SleepStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `duration`, then record the call in these stats.
    pub fn sleep(&self, duration: Duration) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.requested_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        let start = Instant::now();
        thread::sleep(duration);
        let elapsed = start.elapsed();
        self.elapsed_ns
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn total_calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn total_requested_ms(&self) -> u64 {
        self.requested_ms.load(Ordering::Relaxed)
    }

    pub fn total_elapsed_ns(&self) -> u64 {
        self.elapsed_ns.load(Ordering::Relaxed)
    }

    /// Atomically zero every counter.
    pub fn reset(&self) {
        self.calls.store(0, Ordering::Relaxed);
        self.requested_ms.store(0, Ordering::Relaxed);
        self.elapsed_ns.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_takes_precedence() {
        let mut table = SleepTable::new();
        let default = table.duration(SleepPhase::PostOpen, TransportKind::I2c);
        assert_eq!(default, Duration::from_millis(100));

        table.set(SleepPhase::PostOpen, TransportKind::I2c, Duration::from_millis(5));
        assert_eq!(
            table.duration(SleepPhase::PostOpen, TransportKind::I2c),
            Duration::from_millis(5)
        );
        // unrelated phase/transport pairs are untouched
        assert_eq!(
            table.duration(SleepPhase::PostOpen, TransportKind::Usb),
            Duration::from_millis(60)
        );
    }

    #[test]
    fn stats_accumulate_and_reset() {
        let stats = SleepStats::new();
        stats.sleep(Duration::from_millis(1));
        stats.sleep(Duration::from_millis(1));
        assert_eq!(stats.total_calls(), 2);
        assert!(stats.total_requested_ms() >= 2);
        assert!(stats.total_elapsed_ns() > 0);
        stats.reset();
        assert_eq!(stats.total_calls(), 0);
        assert_eq!(stats.total_requested_ms(), 0);
        assert_eq!(stats.total_elapsed_ns(), 0);
    }
}
