//! The bounded retry state machine (spec.md §4.4).

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::ErrorKind;
use crate::transport::{TransportError, TransportKind};

/// The absolute upper bound on retry maxima, regardless of configuration
/// (spec.md §4.4: "absolute upper bound enforced").
pub const ABSOLUTE_MAX_TRIES: usize = 16;

/// The three retry classes, each with its own configurable maximum.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RetryClass {
    WriteOnly,
    WriteRead,
    MultiPart,
}

impl RetryClass {
    const ALL: [RetryClass; 3] = [RetryClass::WriteOnly, RetryClass::WriteRead, RetryClass::MultiPart];

    fn literature_default(self) -> usize {
        match self {
            RetryClass::WriteOnly => 4,
            RetryClass::WriteRead => 4,
            RetryClass::MultiPart => 10,
        }
    }
}

/// Configurable per-class retry maxima.
#[derive(Clone, Debug)]
pub struct RetryMaxima {
    maxima: HashMap<RetryClass, usize>,
}

impl Default for RetryMaxima {
    fn default() -> Self {
        RetryMaxima {
            maxima: RetryClass::ALL
                .iter()
                .map(|&c| (c, c.literature_default()))
                .collect(),
        }
    }
}

impl RetryMaxima {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum try count for `class`. `max_tries = 1` disables
    /// retry for that class (spec.md §8, "boundary behaviors"). Clamped to
    /// [`ABSOLUTE_MAX_TRIES`].
    pub fn set(&mut self, class: RetryClass, max_tries: usize) {
        let max_tries = max_tries.clamp(1, ABSOLUTE_MAX_TRIES);
        self.maxima.insert(class, max_tries);
    }

    pub fn get(&self, class: RetryClass) -> usize {
        self.maxima
            .get(&class)
            .copied()
            .unwrap_or_else(|| class.literature_default())
    }
}

/// Is `kind` retryable on `transport`, per the table in spec.md §4.4?
pub fn is_retryable(kind: &ErrorKind, transport: TransportKind, all_zero_response_ok: bool) -> bool {
    use ErrorKind::*;
    use TransportKind::*;

    match kind {
        NullResponse => false,
        Transport(TransportError::BadDescriptor) => false,
        ReadAllZero => match transport {
            Adapter => true,
            I2c | Usb => !all_zero_response_ok,
        },
        ReadEqualsWrite => true,
        DdcData => true,
        Transport(TransportError::Busy) => matches!(transport, I2c | Usb),
        Transport(_) => matches!(transport, I2c | Usb),
        _ => false,
    }
}

/// Per-class histogram of successes by try-count, plus a failure tally
/// (spec.md §3, "Retry Statistics").
#[derive(Default)]
struct ClassStats {
    /// `successes[n - 1]` counts terminal successes on the n-th attempt.
    successes: Vec<u64>,
    failures: u64,
}

/// Process-wide retry statistics, reset on demand.
pub struct RetryStats {
    inner: Mutex<HashMap<RetryClass, ClassStats>>,
}

impl Default for RetryStats {
    fn default() -> Self {
        RetryStats {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl RetryStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_success(&self, class: RetryClass, try_count: usize) {
        let mut guard = self.inner.lock().unwrap();
        let entry = guard.entry(class).or_default();
        if entry.successes.len() < try_count {
            entry.successes.resize(try_count, 0);
        }
        entry.successes[try_count - 1] += 1;
    }

    fn record_failure(&self, class: RetryClass) {
        let mut guard = self.inner.lock().unwrap();
        guard.entry(class).or_default().failures += 1;
    }

    /// Successes at each try-count (1-indexed by position) for `class`.
    pub fn successes(&self, class: RetryClass) -> Vec<u64> {
        self.inner
            .lock()
            .unwrap()
            .get(&class)
            .map(|c| c.successes.clone())
            .unwrap_or_default()
    }

    /// Total ultimate failures recorded for `class`.
    pub fn failures(&self, class: RetryClass) -> u64 {
        self.inner
            .lock()
            .unwrap()
            .get(&class)
            .map(|c| c.failures)
            .unwrap_or(0)
    }

    /// Atomically clear every counter.
    pub fn reset(&self) {
        self.inner.lock().unwrap().clear();
    }
}

/// Run `op` up to `maxima.get(class)` times, collapsing a persistently
/// retryable error into [`ErrorKind::Retries`] (or [`ErrorKind::AllTriesZero`]
/// when every attempt returned [`ErrorKind::ReadAllZero`]), and recording
/// the terminal outcome in `stats`.
///
/// `op` receives the 1-based attempt number, mostly so callers can log it.
pub fn with_retry<T>(
    class: RetryClass,
    transport: TransportKind,
    all_zero_response_ok: bool,
    maxima: &RetryMaxima,
    stats: &RetryStats,
    mut op: impl FnMut(usize) -> Result<T, ErrorKind>,
) -> Result<T, ErrorKind> {
    let max_tries = maxima.get(class);
    let mut all_zero_so_far = true;

    for attempt in 1..=max_tries {
        match op(attempt) {
            Ok(value) => {
                stats.record_success(class, attempt);
                return Ok(value);
            }
            Err(err) => {
                if !matches!(err, ErrorKind::ReadAllZero) {
                    all_zero_so_far = false;
                }
                if !is_retryable(&err, transport, all_zero_response_ok) {
                    stats.record_failure(class);
                    return Err(err);
                }
                log::debug!("ddc-core: retry {class:?} attempt {attempt}/{max_tries} failed: {err}");
            }
        }
    }

    stats.record_failure(class);
    if all_zero_so_far {
        Err(ErrorKind::AllTriesZero)
    } else {
        Err(ErrorKind::Retries)
    }
}

impl std::fmt::Debug for RetryClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RetryClass::WriteOnly => "write-only",
            RetryClass::WriteRead => "write-read",
            RetryClass::MultiPart => "multi-part",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_retryable_error_invokes_once() {
        let maxima = RetryMaxima::new();
        let stats = RetryStats::new();
        let mut calls = 0;
        let result: Result<(), ErrorKind> = with_retry(
            RetryClass::WriteRead,
            TransportKind::I2c,
            false,
            &maxima,
            &stats,
            |_| {
                calls += 1;
                Err(ErrorKind::NullResponse)
            },
        );
        assert_eq!(calls, 1);
        assert_eq!(result, Err(ErrorKind::NullResponse));
    }

    #[test]
    fn retryable_error_exhausts_max_tries() {
        let mut maxima = RetryMaxima::new();
        maxima.set(RetryClass::WriteRead, 4);
        let stats = RetryStats::new();
        let mut calls = 0;
        let result: Result<(), ErrorKind> = with_retry(
            RetryClass::WriteRead,
            TransportKind::I2c,
            false,
            &maxima,
            &stats,
            |_| {
                calls += 1;
                Err(ErrorKind::DdcData)
            },
        );
        assert_eq!(calls, 4);
        assert_eq!(result, Err(ErrorKind::Retries));
    }

    #[test]
    fn all_zero_every_attempt_yields_all_tries_zero() {
        let mut maxima = RetryMaxima::new();
        maxima.set(RetryClass::WriteRead, 4);
        let stats = RetryStats::new();
        let result: Result<(), ErrorKind> = with_retry(
            RetryClass::WriteRead,
            TransportKind::I2c,
            false,
            &maxima,
            &stats,
            |_| Err(ErrorKind::ReadAllZero),
        );
        assert_eq!(result, Err(ErrorKind::AllTriesZero));
    }

    #[test]
    fn success_after_retries_returns_value_and_records_try_count() {
        let maxima = RetryMaxima::new();
        let stats = RetryStats::new();
        let mut attempts = 0;
        let result = with_retry(
            RetryClass::WriteRead,
            TransportKind::I2c,
            false,
            &maxima,
            &stats,
            |_| {
                attempts += 1;
                if attempts < 3 {
                    Err(ErrorKind::ReadAllZero)
                } else {
                    Ok(42)
                }
            },
        );
        assert_eq!(result, Ok(42));
        assert_eq!(stats.successes(RetryClass::WriteRead), vec![0, 0, 1]);
    }

    #[test]
    fn max_tries_one_disables_retry() {
        let mut maxima = RetryMaxima::new();
        maxima.set(RetryClass::WriteRead, 1);
        let stats = RetryStats::new();
        let mut calls = 0;
        let result: Result<(), ErrorKind> = with_retry(
            RetryClass::WriteRead,
            TransportKind::I2c,
            false,
            &maxima,
            &stats,
            |_| {
                calls += 1;
                Err(ErrorKind::DdcData)
            },
        );
        assert_eq!(calls, 1);
        assert_eq!(result, Err(ErrorKind::Retries));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    // spec.md §8.4: a non-retryable error is invoked exactly once,
    // regardless of the configured maximum.
    proptest! {
        #[test]
        fn non_retryable_error_invokes_exactly_once(max_tries in 1usize..=ABSOLUTE_MAX_TRIES) {
            let mut maxima = RetryMaxima::new();
            maxima.set(RetryClass::WriteRead, max_tries);
            let stats = RetryStats::new();
            let mut calls = 0;
            let result: Result<(), ErrorKind> = with_retry(
                RetryClass::WriteRead,
                TransportKind::I2c,
                false,
                &maxima,
                &stats,
                |_| {
                    calls += 1;
                    Err(ErrorKind::NullResponse)
                },
            );
            prop_assert_eq!(calls, 1);
            prop_assert_eq!(result, Err(ErrorKind::NullResponse));
        }

        // spec.md §8.5: a persistently retryable error is invoked exactly
        // `max_tries` times and collapses to RETRIES (or ALL_TRIES_ZERO when
        // every attempt was READ_ALL_ZERO).
        #[test]
        fn retryable_error_invokes_exactly_max_tries(max_tries in 1usize..=ABSOLUTE_MAX_TRIES) {
            let mut maxima = RetryMaxima::new();
            maxima.set(RetryClass::WriteRead, max_tries);
            let stats = RetryStats::new();
            let mut calls = 0;
            let result: Result<(), ErrorKind> = with_retry(
                RetryClass::WriteRead,
                TransportKind::I2c,
                false,
                &maxima,
                &stats,
                |_| {
                    calls += 1;
                    Err(ErrorKind::DdcData)
                },
            );
            prop_assert_eq!(calls, max_tries);
            prop_assert_eq!(result, Err(ErrorKind::Retries));
        }

        #[test]
        fn all_zero_every_attempt_always_yields_all_tries_zero(max_tries in 1usize..=ABSOLUTE_MAX_TRIES) {
            let mut maxima = RetryMaxima::new();
            maxima.set(RetryClass::WriteRead, max_tries);
            let stats = RetryStats::new();
            let mut calls = 0;
            let result: Result<(), ErrorKind> = with_retry(
                RetryClass::WriteRead,
                TransportKind::I2c,
                false,
                &maxima,
                &stats,
                |_| {
                    calls += 1;
                    Err(ErrorKind::ReadAllZero)
                },
            );
            prop_assert_eq!(calls, max_tries);
            prop_assert_eq!(result, Err(ErrorKind::AllTriesZero));
        }
    }
}
