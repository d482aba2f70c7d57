//! The multi-part (segmented) reader used by capabilities and table reads
//! (spec.md §4.5).

use crate::error::ErrorKind;
use crate::retry::{with_retry, RetryClass, RetryMaxima, RetryStats};
use crate::transport::TransportKind;

/// Bounds on a multi-part read, to guarantee termination against a monitor
/// that never sends a terminating fragment.
#[derive(Copy, Clone, Debug)]
pub struct MultiPartLimits {
    /// Maximum accumulated payload bytes across all fragments.
    pub max_total: usize,
    /// Maximum number of fragments, independent of their size.
    pub max_fragments: usize,
}

impl Default for MultiPartLimits {
    fn default() -> Self {
        MultiPartLimits {
            max_total: 8192,
            max_fragments: 256,
        }
    }
}

/// Read a full multi-part reply by issuing one fragment exchange per
/// offset, starting at 0 and advancing by the previous fragment's length.
///
/// `fetch_fragment(offset, attempt)` performs a single write-read exchange
/// requesting data starting at `offset` and returns `(echoed_offset, data)`;
/// `attempt` is the 1-based retry attempt, passed through for logging. Each
/// fragment is independently wrapped in a [`RetryClass::MultiPart`] retry
/// (spec.md §4.4): an offset mismatch is reported to the retry controller as
/// [`ErrorKind::MultiPartReadFragment`], exactly as a framing error would be.
///
/// A fragment with zero-length data -- at any offset -- terminates the read
/// (see DESIGN.md for why this does not require the offset to be nonzero).
pub fn read_multi(
    mut fetch_fragment: impl FnMut(u16, usize) -> Result<(u16, Vec<u8>), ErrorKind>,
    transport: TransportKind,
    maxima: &RetryMaxima,
    stats: &RetryStats,
    limits: &MultiPartLimits,
) -> Result<Vec<u8>, ErrorKind> {
    let mut collected = Vec::new();
    let mut offset: u16 = 0;

    for _ in 0..limits.max_fragments {
        let fragment = with_retry(RetryClass::MultiPart, transport, false, maxima, stats, |attempt| {
            let (echoed_offset, data) = fetch_fragment(offset, attempt)?;
            if echoed_offset != offset {
                return Err(ErrorKind::MultiPartReadFragment);
            }
            Ok(data)
        })?;

        if fragment.is_empty() {
            return Ok(collected);
        }

        collected.extend_from_slice(&fragment);
        if collected.len() > limits.max_total {
            return Err(ErrorKind::DdcData);
        }

        offset = offset
            .checked_add(fragment.len() as u16)
            .ok_or(ErrorKind::DdcData)?;
    }

    Err(ErrorKind::DdcData)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_fragments_until_empty() {
        let maxima = RetryMaxima::new();
        let stats = RetryStats::new();
        let limits = MultiPartLimits::default();
        let chunks: Vec<Vec<u8>> = vec![vec![1, 2, 3], vec![4, 5], vec![]];
        let mut calls = 0;
        let result = read_multi(
            |offset, _attempt| {
                let chunk = chunks[calls].clone();
                calls += 1;
                Ok((offset, chunk))
            },
            TransportKind::I2c,
            &maxima,
            &stats,
            &limits,
        )
        .unwrap();
        assert_eq!(result, vec![1, 2, 3, 4, 5]);
        assert_eq!(calls, 3);
    }

    #[test]
    fn offset_mismatch_is_retried_then_fails() {
        let mut maxima = RetryMaxima::new();
        maxima.set(RetryClass::MultiPart, 2);
        let stats = RetryStats::new();
        let limits = MultiPartLimits::default();
        let result: Result<Vec<u8>, ErrorKind> = read_multi(
            |_offset, _attempt| Ok((99, vec![1])),
            TransportKind::I2c,
            &maxima,
            &stats,
            &limits,
        );
        assert_eq!(result, Err(ErrorKind::Retries));
    }

    #[test]
    fn zero_length_fragment_at_nonzero_offset_terminates() {
        let maxima = RetryMaxima::new();
        let stats = RetryStats::new();
        let limits = MultiPartLimits::default();
        let mut calls = 0;
        let result = read_multi(
            |offset, _attempt| {
                calls += 1;
                if calls == 1 {
                    Ok((offset, vec![1, 2]))
                } else {
                    Ok((offset, vec![]))
                }
            },
            TransportKind::I2c,
            &maxima,
            &stats,
            &limits,
        )
        .unwrap();
        assert_eq!(result, vec![1, 2]);
    }

    #[test]
    fn runaway_monitor_hits_max_fragments_bound() {
        let maxima = RetryMaxima::new();
        let stats = RetryStats::new();
        let limits = MultiPartLimits {
            max_total: 8192,
            max_fragments: 3,
        };
        let result: Result<Vec<u8>, ErrorKind> = read_multi(
            |offset, _attempt| Ok((offset, vec![0xaa])),
            TransportKind::I2c,
            &maxima,
            &stats,
            &limits,
        );
        assert_eq!(result, Err(ErrorKind::DdcData));
    }
}
