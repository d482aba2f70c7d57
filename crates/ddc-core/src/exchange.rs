//! The write-read / write-only exchange engine (spec.md §4.3): one
//! transport round-trip, sleep phases included, response classified before
//! the packet codec ever sees it.

use crate::error::ErrorKind;
use crate::packet::{is_all_zero, is_echo_of_write, is_null_response, parse_typed_response, RequestFrame, ResponsePacket};
use crate::sleep::{SleepPhase, SleepStats, SleepTable};
use crate::transport::Transport;

/// Write `frame` and sleep the post-write phase. Used for fire-and-forget
/// commands (`VCP Set`, `VCP Reset`, `Save Current Settings`, `Table Write`).
pub fn write_only(
    transport: &mut dyn Transport,
    sleep_table: &SleepTable,
    sleep_stats: &SleepStats,
    frame: &RequestFrame,
) -> Result<(), ErrorKind> {
    transport.write(frame.as_bytes())?;
    sleep_stats.sleep(sleep_table.duration(SleepPhase::PostWrite, transport.kind()));
    Ok(())
}

/// Write `frame`, sleep write-to-read, read up to `max_read` bytes, sleep
/// post-read, then classify the raw reply before parsing it.
///
/// Classification order (spec.md §4.3): all-zero bytes, then an echo of the
/// request, then the DDC Null Message, and only then the typed packet
/// codec. A single-byte or empty read is folded into [`ErrorKind::DdcData`]
/// by the codec rather than treated as a fourth special case.
pub fn write_read(
    transport: &mut dyn Transport,
    sleep_table: &SleepTable,
    sleep_stats: &SleepStats,
    frame: &RequestFrame,
    expected_opcode: u8,
    expected_subtype: Option<u8>,
    max_read: usize,
) -> Result<ResponsePacket, ErrorKind> {
    transport.write(frame.as_bytes())?;
    sleep_stats.sleep(sleep_table.duration(SleepPhase::WriteToRead, transport.kind()));

    let mut buf = vec![0u8; max_read];
    let n = transport.read(&mut buf)?;
    buf.truncate(n);
    sleep_stats.sleep(sleep_table.duration(SleepPhase::PostRead, transport.kind()));

    if is_all_zero(&buf) {
        return Err(ErrorKind::ReadAllZero);
    }
    if is_echo_of_write(&buf, frame) {
        return Err(ErrorKind::ReadEqualsWrite);
    }
    if is_null_response(&buf) {
        return Err(ErrorKind::NullResponse);
    }

    parse_typed_response(&buf, expected_opcode, expected_subtype)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{build_vcp_request, checksum, Opcode, MONITOR_REPLY_SEED};
    use crate::transport::{TransportError, TransportKind};

    struct FakeTransport {
        kind: TransportKind,
        reply: Vec<u8>,
        written: Vec<u8>,
    }

    impl Transport for FakeTransport {
        fn kind(&self) -> TransportKind {
            self.kind
        }
        fn write(&mut self, frame: &[u8]) -> Result<(), TransportError> {
            self.written = frame.to_vec();
            Ok(())
        }
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
            let n = self.reply.len().min(buf.len());
            buf[..n].copy_from_slice(&self.reply[..n]);
            Ok(n)
        }
    }

    fn vcp_reply(feature: u8, current: u16, max: u16) -> Vec<u8> {
        let [max_hi, max_lo] = max.to_be_bytes();
        let [cur_hi, cur_lo] = current.to_be_bytes();
        // opcode + [result, feature, type, max_hi, max_lo, cur_hi, cur_lo] = 8 bytes
        let mut raw = vec![
            0x80 | 8,
            Opcode::VcpReply.byte(),
            0x00,
            feature,
            0x00,
            max_hi,
            max_lo,
            cur_hi,
            cur_lo,
        ];
        let sum = checksum(MONITOR_REPLY_SEED, raw.iter().copied());
        raw.push(sum);
        raw
    }

    #[test]
    fn happy_path_parses_vcp_reply() {
        let mut transport = FakeTransport {
            kind: TransportKind::I2c,
            reply: vcp_reply(0x10, 50, 100),
            written: vec![],
        };
        let table = SleepTable::new();
        let stats = SleepStats::new();
        let frame = build_vcp_request(0x10);
        let resp = write_read(
            &mut transport,
            &table,
            &stats,
            &frame,
            Opcode::VcpReply.byte(),
            Some(0x10),
            32,
        )
        .unwrap();
        assert_eq!(resp.data[0], 0x00);
        assert_eq!(stats.total_calls(), 2);
    }

    #[test]
    fn all_zero_reply_classified_before_parsing() {
        let mut transport = FakeTransport {
            kind: TransportKind::I2c,
            reply: vec![0u8; 11],
            written: vec![],
        };
        let table = SleepTable::new();
        let stats = SleepStats::new();
        let frame = build_vcp_request(0x10);
        let result = write_read(&mut transport, &table, &stats, &frame, Opcode::VcpReply.byte(), Some(0x10), 32);
        assert_eq!(result, Err(ErrorKind::ReadAllZero));
    }

    #[test]
    fn echoed_write_classified_before_null_check() {
        let frame = build_vcp_request(0x10);
        let mut transport = FakeTransport {
            kind: TransportKind::I2c,
            reply: frame.as_bytes().to_vec(),
            written: vec![],
        };
        let table = SleepTable::new();
        let stats = SleepStats::new();
        let result = write_read(&mut transport, &table, &stats, &frame, Opcode::VcpReply.byte(), Some(0x10), 32);
        assert_eq!(result, Err(ErrorKind::ReadEqualsWrite));
    }

    #[test]
    fn null_message_detected() {
        let mut transport = FakeTransport {
            kind: TransportKind::I2c,
            reply: crate::packet::DDC_NULL_MESSAGE.to_vec(),
            written: vec![],
        };
        let table = SleepTable::new();
        let stats = SleepStats::new();
        let frame = build_vcp_request(0x10);
        let result = write_read(&mut transport, &table, &stats, &frame, Opcode::VcpReply.byte(), Some(0x10), 32);
        assert_eq!(result, Err(ErrorKind::NullResponse));
    }
}
