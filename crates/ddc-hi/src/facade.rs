//! Unified read/write/verify for continuous, non-continuous, and table VCP
//! features (spec.md §4.7).

use ddc_core::context::Context;
use ddc_core::error::ErrorKind;
use ddc_core::multipart::{read_multi, MultiPartLimits};
use ddc_core::packet::{
    build_capabilities_request, build_table_read_request, build_table_write, build_vcp_request, build_vcp_set,
    Opcode, ResponsePacket,
};
use ddc_core::retry::{with_retry, RetryClass};
use ddc_core::transport::Transport;
use ddc_core::vcp::VcpValue;

use crate::handle::DisplayHandle;
use crate::reference::ReferenceFlags;

/// Which shape of value a feature read is expected to return. The facade
/// doesn't parse the capabilities string (that stays outside the Non-goal
/// boundary, spec.md §1), so callers -- `ddcset`, or a future capability
/// parser -- tell it which wire shape to expect.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VcpValueKind {
    Simple,
    Table,
}

/// Read `feature` from the display behind `handle`.
///
/// Dispatches on `kind`: [`VcpValueKind::Simple`] performs a single
/// write-read exchange; [`VcpValueKind::Table`] drives the multi-part
/// reader. `AllTriesZero`, and (when the display uses the null-response
/// convention) `NullResponse`, are both translated to
/// [`ErrorKind::DeterminedUnsupported`] here -- except for feature `0x00`,
/// whose null response is a positive probe result handled by
/// [`probe_null_response_convention`], not by this function.
pub fn get_value(handle: &mut DisplayHandle<'_>, ctx: &Context, feature: u8, kind: VcpValueKind) -> Result<VcpValue, ErrorKind> {
    assert!(feature != 0x00, "feature 0x00 is reserved for the null-response probe");
    let uses_null_convention = handle
        .reference()
        .flags()
        .contains(ReferenceFlags::USES_NULL_RESPONSE_FOR_UNSUPPORTED);

    let result = match kind {
        VcpValueKind::Simple => read_simple(handle.transport_mut(), ctx, feature),
        VcpValueKind::Table => read_table(handle.transport_mut(), ctx, feature),
    };

    translate_unsupported(result, uses_null_convention)
}

fn translate_unsupported(result: Result<VcpValue, ErrorKind>, uses_null_convention: bool) -> Result<VcpValue, ErrorKind> {
    match result {
        Err(ErrorKind::AllTriesZero) => Err(ErrorKind::DeterminedUnsupported),
        Err(ErrorKind::NullResponse) if uses_null_convention => Err(ErrorKind::DeterminedUnsupported),
        other => other,
    }
}

/// Write `value` to `feature`. When `verify` is set, immediately reads the
/// feature back and compares; a mismatch is reported as [`ErrorKind::Verify`]
/// rather than as success (spec.md §4.7).
pub fn set_value(
    handle: &mut DisplayHandle<'_>,
    ctx: &Context,
    feature: u8,
    value: &VcpValue,
    verify: bool,
) -> Result<(), ErrorKind> {
    let transport = handle.transport_mut();
    let transport_kind = transport.kind();

    match value {
        VcpValue::Simple { current, .. } => {
            let frame = build_vcp_set(feature, *current);
            with_retry(RetryClass::WriteOnly, transport_kind, false, &ctx.retry_maxima, &ctx.retry_stats, |_| {
                ddc_core::exchange::write_only(transport, &ctx.sleep_table, &ctx.sleep_stats, &frame)
            })?;
        }
        VcpValue::Table(bytes) => {
            let mut offset: u16 = 0;
            for chunk in bytes.chunks(32) {
                let frame = build_table_write(feature, offset, chunk);
                with_retry(RetryClass::WriteOnly, transport_kind, false, &ctx.retry_maxima, &ctx.retry_stats, |_| {
                    ddc_core::exchange::write_only(transport, &ctx.sleep_table, &ctx.sleep_stats, &frame)
                })?;
                offset += chunk.len() as u16;
            }
        }
    }

    if verify {
        let kind = match value {
            VcpValue::Simple { .. } => VcpValueKind::Simple,
            VcpValue::Table(_) => VcpValueKind::Table,
        };
        let uses_null_convention = handle
            .reference()
            .flags()
            .contains(ReferenceFlags::USES_NULL_RESPONSE_FOR_UNSUPPORTED);
        let read_back = match kind {
            VcpValueKind::Simple => read_simple(handle.transport_mut(), ctx, feature),
            VcpValueKind::Table => read_table(handle.transport_mut(), ctx, feature),
        };
        let read_back = translate_unsupported(read_back, uses_null_convention)?;
        // A VCP Set only writes `current`; the monitor-reported `maximum` on
        // read-back is independent data, not something the write touched
        // (callers routinely build the write value with `maximum: 0`).
        let matches = match (value, &read_back) {
            (VcpValue::Simple { current: want, .. }, VcpValue::Simple { current: got, .. }) => want == got,
            (VcpValue::Table(want), VcpValue::Table(got)) => want == got,
            _ => false,
        };
        if !matches {
            return Err(ErrorKind::Verify);
        }
    }

    Ok(())
}

/// Retrieve the capability string, caching it on the reference (spec.md
/// §4.7). Subsequent calls return the cached bytes without touching the
/// transport.
pub fn get_capabilities(handle: &mut DisplayHandle<'_>, ctx: &Context) -> Result<Vec<u8>, ErrorKind> {
    if let Some(cached) = handle.reference().capabilities_cache() {
        return Ok(cached);
    }

    let transport_kind = handle.transport_kind();
    let transport = handle.transport_mut();
    let bytes = read_multi(
        |offset, _attempt| {
            let frame = build_capabilities_request(offset);
            let resp = ddc_core::exchange::write_read(
                transport,
                &ctx.sleep_table,
                &ctx.sleep_stats,
                &frame,
                Opcode::CapabilitiesReply.byte(),
                None,
                35,
            )?;
            decode_offset_fragment(&resp)
        },
        transport_kind,
        &ctx.retry_maxima,
        &ctx.retry_stats,
        &MultiPartLimits::default(),
    )?;

    handle.reference().cache_capabilities(bytes.clone());
    Ok(bytes)
}

fn read_simple(transport: &mut dyn Transport, ctx: &Context, feature: u8) -> Result<VcpValue, ErrorKind> {
    let transport_kind = transport.kind();
    let frame = build_vcp_request(feature);
    with_retry(RetryClass::WriteRead, transport_kind, false, &ctx.retry_maxima, &ctx.retry_stats, |_| {
        let resp = ddc_core::exchange::write_read(
            transport,
            &ctx.sleep_table,
            &ctx.sleep_stats,
            &frame,
            Opcode::VcpReply.byte(),
            Some(feature),
            11,
        )?;
        decode_vcp_reply(&resp)
    })
}

fn read_table(transport: &mut dyn Transport, ctx: &Context, feature: u8) -> Result<VcpValue, ErrorKind> {
    let transport_kind = transport.kind();
    let bytes = read_multi(
        |offset, _attempt| {
            let frame = build_table_read_request(feature, offset);
            let resp = ddc_core::exchange::write_read(
                transport,
                &ctx.sleep_table,
                &ctx.sleep_stats,
                &frame,
                Opcode::TableReadReply.byte(),
                None,
                35,
            )?;
            decode_offset_fragment(&resp)
        },
        transport_kind,
        &ctx.retry_maxima,
        &ctx.retry_stats,
        &MultiPartLimits::default(),
    )?;
    Ok(VcpValue::Table(bytes))
}

/// Decode a VCP reply's payload: `[result, feature, type, max_hi, max_lo, cur_hi, cur_lo]`.
fn decode_vcp_reply(resp: &ResponsePacket) -> Result<VcpValue, ErrorKind> {
    if resp.data.len() != 7 {
        return Err(ErrorKind::DdcData);
    }
    if resp.data[0] == 0x01 {
        return Err(ErrorKind::ReportedUnsupported);
    }
    let maximum = u16::from_be_bytes([resp.data[3], resp.data[4]]);
    let current = u16::from_be_bytes([resp.data[5], resp.data[6]]);
    Ok(VcpValue::Simple { current, maximum })
}

/// Decode a table-read or capabilities reply's payload:
/// `[offset_hi, offset_lo, data...]`, returning `(echoed_offset, data)` for
/// [`read_multi`].
fn decode_offset_fragment(resp: &ResponsePacket) -> Result<(u16, Vec<u8>), ErrorKind> {
    if resp.data.len() < 2 {
        return Err(ErrorKind::DdcData);
    }
    let offset = u16::from_be_bytes([resp.data[0], resp.data[1]]);
    Ok((offset, resp.data[2..].to_vec()))
}

/// Issue the reserved feature-0x00 probe used to determine whether this
/// display's "unsupported" convention is the DDC Null Message rather than
/// the standard result-code bit (spec.md §4.6). Unlike [`get_value`], a
/// `NULL_RESPONSE` here is the *expected positive* outcome.
pub(crate) fn probe_null_response_convention(transport: &mut dyn Transport, ctx: &Context) -> Result<bool, ErrorKind> {
    let transport_kind = transport.kind();
    let frame = build_vcp_request(0x00);
    let result = with_retry(RetryClass::WriteRead, transport_kind, false, &ctx.retry_maxima, &ctx.retry_stats, |_| {
        let resp = ddc_core::exchange::write_read(
            transport,
            &ctx.sleep_table,
            &ctx.sleep_stats,
            &frame,
            Opcode::VcpReply.byte(),
            Some(0x00),
            11,
        )?;
        decode_vcp_reply(&resp)
    });

    match result {
        Ok(_) | Err(ErrorKind::ReportedUnsupported) => Ok(false),
        Err(ErrorKind::NullResponse) => Ok(true),
        Err(other) => Err(other),
    }
}
