//! DDC/CI packet framing, checksums, and the VCP/capabilities/table opcode
//! wire format.

use std::iter;

use crate::error::ErrorKind;

/// EDID EEPROM I2C address
pub const I2C_ADDRESS_EDID: u16 = 0x50;

/// E-DDC EDID segment register I2C address
pub const I2C_ADDRESS_EDID_SEGMENT: u16 = 0x30;

/// DDC/CI command and control I2C address
pub const I2C_ADDRESS_DDC_CI: u16 = 0x37;

/// DDC sub-address command prefix, used as the first byte of every
/// host-originated frame.
pub const SUB_ADDRESS_DDC_CI: u8 = 0x51;

/// Checksum seed used for frames written by the host.
pub const HOST_WRITE_SEED: u8 = (I2C_ADDRESS_DDC_CI as u8) << 1;

/// Checksum seed used for frames written by the monitor.
///
/// The source material for this protocol disagrees with itself about the
/// exact byte here (one description writes it as a literal `0x6e?` with a
/// question mark). We take the explicit value from the external-interface
/// section and apply it consistently, rather than re-deriving the teacher
/// crate's `(addr << 1) | 1` plus an injected extra sub-address byte -- see
/// DESIGN.md.
pub const MONITOR_REPLY_SEED: u8 = 0x50;

/// The "DDC Null Message" some monitors send in place of an
/// unsupported-feature result, as seen by this module.
///
/// On the wire this is 4 bytes, `6f 6e 80 be`, with `0x6f` a leading
/// source-address echo byte that every transport in this workspace strips
/// before handing bytes to [`parse_typed_response`] (see that function's
/// doc comment). What reaches here is the remaining 3 bytes.
pub const DDC_NULL_MESSAGE: [u8; 3] = [0x6e, 0x80, 0xbe];

/// VCP feature code, a single MCCS opcode byte.
pub type FeatureCode = u8;

/// Opcodes used directly by the core (spec.md §6).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Opcode {
    VcpRequest,
    VcpReply,
    VcpSet,
    VcpReset,
    SaveCurrentSettings,
    TableReadRequest,
    TableReadReply,
    TableWrite,
    CapabilitiesRequest,
    CapabilitiesReply,
}

impl Opcode {
    pub const fn byte(self) -> u8 {
        match self {
            Opcode::VcpRequest => 0x01,
            Opcode::VcpReply => 0x02,
            Opcode::VcpSet => 0x03,
            Opcode::VcpReset => 0x09,
            Opcode::SaveCurrentSettings => 0x0c,
            Opcode::TableReadRequest => 0xe2,
            Opcode::TableReadReply => 0xe4,
            Opcode::TableWrite => 0xe7,
            Opcode::CapabilitiesRequest => 0xf3,
            Opcode::CapabilitiesReply => 0xe3,
        }
    }
}

/// Maximum payload bytes (opcode + data) in a single DDC/CI frame.
pub const MAX_FRAME_DATA: usize = 35;

/// XOR-fold checksum starting from `seed`.
pub fn checksum(seed: u8, bytes: impl IntoIterator<Item = u8>) -> u8 {
    iter::once(seed).chain(bytes).fold(0u8, |acc, b| acc ^ b)
}

/// A fully framed host-to-monitor request: `[sub-address, len|0x80, opcode, payload..., checksum]`.
///
/// This is the "entire DDC frame" referred to by spec.md §4.1: transports
/// decide for themselves whether the true I2C hardware address needs to be
/// communicated out of band (it does, for `/dev/i2c-N`, via a separate
/// `ioctl`) but the bytes here -- including the `0x51` sub-address -- are
/// exactly what gets written.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequestFrame(Vec<u8>);

impl RequestFrame {
    fn build(opcode: u8, payload: &[u8]) -> Self {
        assert!(payload.len() + 1 <= MAX_FRAME_DATA, "DDC/CI payload too long");
        let data_len = payload.len() + 1;
        let mut frame = Vec::with_capacity(3 + data_len);
        frame.push(SUB_ADDRESS_DDC_CI);
        frame.push(0x80 | data_len as u8);
        frame.push(opcode);
        frame.extend_from_slice(payload);
        let sum = checksum(HOST_WRITE_SEED, frame.iter().copied());
        frame.push(sum);
        RequestFrame(frame)
    }

    /// The encoded bytes, as written to the transport.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Build a `VCP Request` (0x01) frame for `feature`.
pub fn build_vcp_request(feature: FeatureCode) -> RequestFrame {
    RequestFrame::build(Opcode::VcpRequest.byte(), &[feature])
}

/// Build a `VCP Set` (0x03) frame writing a 2-byte continuous/non-continuous value.
pub fn build_vcp_set(feature: FeatureCode, value: u16) -> RequestFrame {
    let [hi, lo] = value.to_be_bytes();
    RequestFrame::build(Opcode::VcpSet.byte(), &[feature, hi, lo])
}

/// Build a `VCP Reset` (0x09) frame.
pub fn build_vcp_reset() -> RequestFrame {
    RequestFrame::build(Opcode::VcpReset.byte(), &[])
}

/// Build a `Save Current Settings` (0x0c) frame.
pub fn build_save_current_settings() -> RequestFrame {
    RequestFrame::build(Opcode::SaveCurrentSettings.byte(), &[])
}

/// Build a `Capabilities Request` (0xf3) frame for the given byte `offset`.
pub fn build_capabilities_request(offset: u16) -> RequestFrame {
    let [hi, lo] = offset.to_be_bytes();
    RequestFrame::build(Opcode::CapabilitiesRequest.byte(), &[hi, lo])
}

/// Build a `Table Read Request` (0xe2) frame.
pub fn build_table_read_request(feature: FeatureCode, offset: u16) -> RequestFrame {
    let [hi, lo] = offset.to_be_bytes();
    RequestFrame::build(Opcode::TableReadRequest.byte(), &[feature, hi, lo])
}

/// Build a `Table Write` (0xe7) frame. `data` must be 32 bytes or fewer
/// (the largest chunk a single DDC/CI table-write fragment can carry).
pub fn build_table_write(feature: FeatureCode, offset: u16, data: &[u8]) -> RequestFrame {
    assert!(data.len() <= 32, "table write fragment too long");
    let [hi, lo] = offset.to_be_bytes();
    let mut payload = Vec::with_capacity(3 + data.len());
    payload.push(feature);
    payload.push(hi);
    payload.push(lo);
    payload.extend_from_slice(data);
    RequestFrame::build(Opcode::TableWrite.byte(), &payload)
}

/// A parsed, checksum-verified monitor response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResponsePacket {
    pub opcode: u8,
    pub data: Vec<u8>,
}

/// Parse and validate a raw monitor response as read from a transport.
///
/// `raw` is the byte sequence returned by [`Transport::read`](crate::transport::Transport::read),
/// which for every transport in this workspace begins with the length byte
/// (the leading source-address echo, if any, is a transport-level framing
/// detail consumed before this function sees the bytes).
///
/// Validates, in order (per spec.md §4.2):
/// 1. the length byte's high bit is set,
/// 2. the checksum matches,
/// 3. the opcode matches `expected_opcode`,
/// 4. if `expected_subtype` is given, the echoed feature/table code matches it.
pub fn parse_typed_response(
    raw: &[u8],
    expected_opcode: u8,
    expected_subtype: Option<u8>,
) -> Result<ResponsePacket, ErrorKind> {
    if raw.len() < 2 {
        return Err(ErrorKind::DdcData);
    }

    if raw[0] & 0x80 == 0 {
        return Err(ErrorKind::DdcData);
    }
    let len = (raw[0] & 0x7f) as usize;

    if raw.len() < len + 2 {
        return Err(ErrorKind::DdcData);
    }

    let sum = checksum(MONITOR_REPLY_SEED, raw[..len + 1].iter().copied());
    if raw[len + 1] != sum {
        return Err(ErrorKind::DdcData);
    }

    if len == 0 {
        return Err(ErrorKind::DdcData);
    }
    let opcode = raw[1];
    let data = raw[2..len + 1].to_vec();

    if opcode != expected_opcode {
        return Err(ErrorKind::DdcData);
    }

    // The echoed feature code, where applicable, lives at data[1] for a VCP
    // reply (data[0] is the result code). Table-read and capabilities
    // replies echo a 16-bit *offset* instead of a feature code; that check
    // is more specific than a single expected byte (the multi-part reader
    // owns it, as `MULTI_PART_READ_FRAGMENT`) so `expected_subtype` is only
    // meaningful for VCP replies.
    if let Some(expected) = expected_subtype {
        if opcode != Opcode::VcpReply.byte() || data.get(1).copied() != Some(expected) {
            return Err(ErrorKind::DdcData);
        }
    }

    Ok(ResponsePacket { opcode, data })
}

/// Is `raw` exactly the (address-stripped) DDC Null Message?
pub fn is_null_response(raw: &[u8]) -> bool {
    raw == DDC_NULL_MESSAGE
}

/// Is `raw` all-zero (the degenerate "no reply" pattern)?
pub fn is_all_zero(raw: &[u8]) -> bool {
    !raw.is_empty() && raw.iter().all(|&b| b == 0)
}

/// Is `raw` byte-for-byte identical to the request that was just written
/// (some monitors echo the write back instead of replying)?
pub fn is_echo_of_write(raw: &[u8], request: &RequestFrame) -> bool {
    raw == request.as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s1_brightness_request_checksum() {
        // spec.md §8 S1: `51 82 01 10 ac`
        let frame = build_vcp_request(0x10);
        assert_eq!(frame.as_bytes(), &[0x51, 0x82, 0x01, 0x10, 0xac]);
    }

    #[test]
    fn vcp_set_frame_shape() {
        let frame = build_vcp_set(0x10, 50);
        assert_eq!(frame.as_bytes()[..4], [0x51, 0x84, 0x03, 0x10]);
        assert_eq!(frame.as_bytes().len(), 7);
    }

    #[test]
    fn capabilities_reply_roundtrip() {
        let mut raw = vec![0x80 | 4, 0xe3, 0x00, 0x00, b'('];
        let sum = checksum(MONITOR_REPLY_SEED, raw.iter().copied());
        raw.push(sum);
        let resp = parse_typed_response(&raw, Opcode::CapabilitiesReply.byte(), None).unwrap();
        assert_eq!(resp.data, vec![0x00, 0x00, b'(']);
    }

    #[test]
    fn rejects_missing_length_bit() {
        let raw = [0x04, 0x02, 0x00, 0x10, 0x00, 0x64, 0x00, 0x32, 0xff];
        assert_eq!(
            parse_typed_response(&raw, Opcode::VcpReply.byte(), None),
            Err(ErrorKind::DdcData)
        );
    }

    #[test]
    fn rejects_checksum_mismatch() {
        // opcode + [result, feature, type, max_hi, max_lo, cur_hi, cur_lo] = 8 bytes
        let mut raw = vec![0x80 | 8, 0x02, 0x00, 0x10, 0x00, 0x00, 0x64, 0x00, 0x32];
        raw.push(checksum(MONITOR_REPLY_SEED, raw.iter().copied()) ^ 0x01);
        assert_eq!(
            parse_typed_response(&raw, Opcode::VcpReply.byte(), None),
            Err(ErrorKind::DdcData)
        );
    }

    #[test]
    fn rejects_wrong_opcode() {
        let mut raw = vec![0x80 | 8, 0x02, 0x00, 0x10, 0x00, 0x00, 0x64, 0x00, 0x32];
        let sum = checksum(MONITOR_REPLY_SEED, raw.iter().copied());
        raw.push(sum);
        assert_eq!(
            parse_typed_response(&raw, Opcode::TableReadReply.byte(), None),
            Err(ErrorKind::DdcData)
        );
    }

    #[test]
    fn null_message_detected() {
        assert!(is_null_response(&DDC_NULL_MESSAGE));
        assert!(!is_null_response(&[0x6e, 0x80, 0xbf]));
    }

    #[test]
    fn all_zero_detected() {
        assert!(is_all_zero(&[0, 0, 0, 0]));
        assert!(!is_all_zero(&[]));
        assert!(!is_all_zero(&[0, 1, 0]));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    // spec.md §8.1: for all well-formed requests, the checksum we compute on
    // receive recomputation matches what we wrote -- a round-trip through
    // `checksum()` itself rather than a full encode/decode cycle, since
    // `RequestFrame` is host-only and `ResponsePacket` is monitor-only in
    // this protocol (there's no single type that both builds and parses).
    proptest! {
        #[test]
        fn built_request_frames_always_verify(feature in any::<u8>()) {
            let frame = build_vcp_request(feature);
            let raw = frame.as_bytes();
            let recomputed = checksum(HOST_WRITE_SEED, raw[..raw.len() - 1].iter().copied());
            prop_assert_eq!(recomputed, *raw.last().unwrap());
        }

        // A monitor reply built with the same shape a `VCP Reply` uses
        // parses back to exactly the feature/value it was built from.
        #[test]
        fn vcp_reply_round_trips_through_parse(
            feature in any::<u8>(),
            current in any::<u16>(),
            maximum in any::<u16>(),
        ) {
            let [max_hi, max_lo] = maximum.to_be_bytes();
            let [cur_hi, cur_lo] = current.to_be_bytes();
            let mut raw = vec![0x80 | 8, Opcode::VcpReply.byte(), 0x00, feature, 0x00, max_hi, max_lo, cur_hi, cur_lo];
            let sum = checksum(MONITOR_REPLY_SEED, raw.iter().copied());
            raw.push(sum);

            let resp = parse_typed_response(&raw, Opcode::VcpReply.byte(), Some(feature)).unwrap();
            prop_assert_eq!(resp.data[3], max_hi);
            prop_assert_eq!(resp.data[4], max_lo);
            prop_assert_eq!(resp.data[5], cur_hi);
            prop_assert_eq!(resp.data[6], cur_lo);
        }

        // spec.md §8.2: checksum coverage. A single-byte mutation anywhere
        // in a well-formed buffer must be detected with overwhelming
        // probability.
        #[test]
        fn single_byte_mutation_breaks_checksum(
            bytes in prop::collection::vec(any::<u8>(), 2..MAX_FRAME_DATA),
            flip_index in any::<usize>(),
            flip_bits in 1u8..=0xff,
        ) {
            let mut buf = bytes.clone();
            let sum = checksum(MONITOR_REPLY_SEED, buf.iter().copied());
            buf.push(sum);

            let idx = flip_index % buf.len();
            buf[idx] ^= flip_bits;

            let still_valid = checksum(MONITOR_REPLY_SEED, buf[..buf.len() - 1].iter().copied()) == buf[buf.len() - 1];
            prop_assert!(!still_valid);
        }

        #[test]
        fn parse_typed_response_rejects_any_corrupted_checksum(
            opcode in any::<u8>(),
            payload in prop::collection::vec(any::<u8>(), 1..16),
            corruption in 1u8..=0xff,
        ) {
            let len = payload.len() + 1;
            let mut raw = vec![0x80 | len as u8, opcode];
            raw.extend_from_slice(&payload);
            let sum = checksum(MONITOR_REPLY_SEED, raw.iter().copied());
            raw.push(sum ^ corruption);

            prop_assert_eq!(parse_typed_response(&raw, opcode, None), Err(ErrorKind::DdcData));
        }
    }
}
