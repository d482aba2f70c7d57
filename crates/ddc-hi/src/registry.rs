//! Display detection and lookup (spec.md §4.6).
//!
//! [`Registry::detect`] runs once per process and owns every
//! [`DisplayReference`] it finds for the remainder of the process lifetime;
//! [`Registry::lookup`] never opens a transport, it only scans the already-
//! detected set. Opening a reference -- producing a [`DisplayHandle`] -- is
//! a separate step via [`Registry::open`] / [`open_display`], since a
//! reference may be looked up many times without ever being opened.

use std::path::{Path, PathBuf};

use ddc_core::context::Context;
use ddc_core::error::ErrorKind;
use ddc_core::sleep::SleepPhase;
use ddc_core::transport::Transport;

use crate::edid::EdidIdentity;
use crate::facade::{self, VcpValueKind};
use crate::handle::DisplayHandle;
use crate::identifier::DisplayIdentifier;
use crate::reference::{DisplayReference, ReferenceFlags, TransportCoordinates};

/// The registry's canonical VCP feature used for the communication check
/// (spec.md §4.6): brightness, present on virtually every monitor that
/// speaks DDC/CI at all.
const COMMUNICATION_CHECK_FEATURE: u8 = 0x10;

/// The VCP feature conventionally used to report the MCCS protocol version.
const MCCS_VERSION_FEATURE: u8 = 0xdf;

/// The detected set of displays, frozen after [`Registry::detect`] returns
/// (spec.md §4.6, §5: "After detection returns, the registry is effectively
/// frozen").
pub struct Registry {
    references: Vec<DisplayReference>,
}

impl Registry {
    /// Run the four-step detection algorithm of spec.md §4.6: enumerate
    /// every transport, then run each reference's initial checks (in
    /// parallel above the threshold spec.md §4.6 and §5 describe), then
    /// assign display numbers.
    pub fn detect(ctx: &Context) -> Self {
        let mut references = Vec::new();
        references.extend(detect_i2c(ctx));
        references.extend(detect_adapter());
        references.extend(detect_hid());

        let has_adapter_refs = references
            .iter()
            .any(|r| matches!(r.coordinates(), TransportCoordinates::Adapter { .. }));
        let run_parallel = references.len() >= 3 && !has_adapter_refs;

        if run_parallel {
            log::debug!("ddc-hi: running initial checks for {} displays in parallel", references.len());
            std::thread::scope(|scope| {
                for reference in references.iter_mut() {
                    scope.spawn(move || run_initial_checks(reference, ctx));
                }
            });
        } else {
            for reference in references.iter_mut() {
                run_initial_checks(reference, ctx);
            }
        }

        let mut dispno = 1u32;
        for reference in references.iter_mut() {
            if reference.flags().contains(ReferenceFlags::DDC_WORKING) {
                reference.assign_dispno(dispno);
                dispno += 1;
            }
        }

        Registry { references }
    }

    /// Every reference detected this process, in detection order.
    pub fn references(&self) -> &[DisplayReference] {
        &self.references
    }

    /// Open a (previously detected) reference, producing an exclusively
    /// owned handle bound to its lifetime.
    pub fn open<'r>(&'r self, reference: &'r DisplayReference, ctx: &Context) -> Result<DisplayHandle<'r>, ErrorKind> {
        open_display(reference, ctx)
    }

    /// Translate `id` to match criteria and linear-scan the registry
    /// (spec.md §4.6). Mismatch on any specified criterion skips the
    /// reference; returns a borrow.
    pub fn lookup(&self, id: &DisplayIdentifier) -> Option<&DisplayReference> {
        match id {
            DisplayIdentifier::DisplayNumber(n) => {
                self.references.iter().find(|r| r.dispno() == *n as i32)
            }
            DisplayIdentifier::I2cBus(bus) => self.references.iter().find(|r| {
                matches!(r.coordinates(), TransportCoordinates::I2c { bus: b, .. } if b == bus)
            }),
            DisplayIdentifier::AdapterIndex { adapter, display } => self.references.iter().find(|r| {
                matches!(
                    r.coordinates(),
                    TransportCoordinates::Adapter { adapter: a, display: d } if a == adapter && d == display
                )
            }),
            DisplayIdentifier::Usb { bus, device } => self.references.iter().find(|r| {
                matches!(
                    r.coordinates(),
                    TransportCoordinates::Usb { bus: b, device: d, .. } if b == bus && d == device
                )
            }),
            DisplayIdentifier::HidDeviceNumber(n) => self
                .references
                .iter()
                .filter(|r| matches!(r.coordinates(), TransportCoordinates::Usb { .. }))
                .nth(*n as usize),
            DisplayIdentifier::Edid(raw) => self
                .references
                .iter()
                .find(|r| r.edid().map(|edid| &edid.raw == raw.as_ref()).unwrap_or(false)),
            DisplayIdentifier::ManufacturerModelSerial { manufacturer, model, serial } => {
                self.references.iter().find(|r| match r.edid() {
                    None => false,
                    Some(edid) => {
                        manufacturer.as_deref().map_or(true, |m| m == edid.manufacturer)
                            && model.as_deref().map_or(true, |m| m == format!("{:04x}", edid.product_code))
                            && serial.as_deref().map_or(true, |s| s == edid.serial_number.to_string())
                    }
                })
            }
        }
    }

    /// Synthesize a transient reference for a direct-coordinate identifier,
    /// bypassing the registry (spec.md §4.6: "under a force flag"). `None`
    /// for any identifier [`DisplayIdentifier::has_direct_coordinates`]
    /// rejects. The caller owns the returned reference and is responsible
    /// for its lifetime -- it is not tracked by this registry and carries no
    /// display number.
    pub fn force_reference(id: &DisplayIdentifier) -> Option<DisplayReference> {
        match id {
            DisplayIdentifier::I2cBus(bus) => Some(DisplayReference::new(
                TransportCoordinates::I2c {
                    bus: *bus,
                    path: PathBuf::from(format!("/dev/i2c-{bus}")),
                },
                None,
            )),
            DisplayIdentifier::AdapterIndex { adapter, display } => Some(DisplayReference::new(
                TransportCoordinates::Adapter { adapter: *adapter, display: *display },
                None,
            )),
            _ => None,
        }
    }
}

/// Open the transport a reference's coordinates name, sleeping the
/// `POST_OPEN` phase on success (spec.md §4.1).
pub fn open_display<'r>(reference: &'r DisplayReference, ctx: &Context) -> Result<DisplayHandle<'r>, ErrorKind> {
    let transport: Box<dyn Transport + Send> = match reference.coordinates() {
        TransportCoordinates::I2c { path, .. } => {
            Box::new(ddc_i2c::I2cTransport::open(path, ctx.io_strategy)?)
        }
        TransportCoordinates::Adapter { adapter, display } => {
            Box::new(ddc_adapter::AdapterTransport::open(*adapter, *display)?)
        }
        TransportCoordinates::Usb { vendor_id, product_id, serial_number, .. } => {
            Box::new(ddc_hid::HidTransport::open(*vendor_id, *product_id, serial_number.as_deref())?)
        }
    };

    let kind = transport.kind();
    ctx.sleep_stats.sleep(ctx.sleep_table.duration(SleepPhase::PostOpen, kind));
    Ok(DisplayHandle::new(transport, reference))
}

fn detect_i2c(ctx: &Context) -> Vec<DisplayReference> {
    let mut out = Vec::new();

    let enumerator = match ddc_i2c::Enumerator::new() {
        Ok(e) => e,
        Err(err) => {
            log::debug!("ddc-hi: i2c bus enumeration unavailable: {err}");
            return out;
        }
    };

    for path in enumerator {
        let bus = match parse_i2c_bus_number(&path) {
            Some(bus) => bus,
            None => continue,
        };

        let mut transport = match ddc_i2c::I2cTransport::open(&path, ctx.io_strategy) {
            Ok(t) => t,
            Err(err) => {
                log::debug!("ddc-hi: could not open {} during detection: {err}", path.display());
                continue;
            }
        };

        let mut raw = [0u8; 128];
        match transport.read_edid(0, &mut raw) {
            Ok(n) if n > 0 => {
                let edid = EdidIdentity::parse(&raw).ok();
                out.push(DisplayReference::new(TransportCoordinates::I2c { bus, path }, edid));
            }
            _ => log::debug!("ddc-hi: no EDID at 0x50 on {}, skipping", path.display()),
        }
    }

    out
}

fn parse_i2c_bus_number(path: &Path) -> Option<u32> {
    path.file_name()?.to_str()?.strip_prefix("i2c-")?.parse().ok()
}

fn detect_adapter() -> Vec<DisplayReference> {
    ddc_adapter::enumerate()
        .into_iter()
        .map(|(adapter, display)| {
            DisplayReference::new(TransportCoordinates::Adapter { adapter, display }, None)
        })
        .collect()
}

fn detect_hid() -> Vec<DisplayReference> {
    ddc_hid::enumerate()
        .into_iter()
        .enumerate()
        .map(|(index, (vendor_id, product_id, serial_number))| {
            DisplayReference::new(
                TransportCoordinates::Usb {
                    bus: 0,
                    device: index as u8,
                    vendor_id,
                    product_id,
                    serial_number,
                },
                None,
            )
        })
        .collect()
}

/// Run the three initial checks of spec.md §4.6 on a freshly enumerated
/// reference: communication, null-response convention, and MCCS version.
/// Idempotent via the reference's flag bits, though detection only ever
/// calls this once per reference.
fn run_initial_checks(reference: &mut DisplayReference, ctx: &Context) {
    let mut handle = match open_display(reference, ctx) {
        Ok(h) => h,
        Err(err) => {
            log::debug!("ddc-hi: initial open failed for {:?}: {err}", reference.coordinates());
            reference.set_communication_checked(false);
            return;
        }
    };

    let communication_working = match facade::get_value(&mut handle, ctx, COMMUNICATION_CHECK_FEATURE, VcpValueKind::Simple) {
        Ok(_) | Err(ErrorKind::ReportedUnsupported) | Err(ErrorKind::DeterminedUnsupported) => true,
        Err(err) => {
            log::debug!("ddc-hi: communication check failed for {:?}: {err}", reference.coordinates());
            false
        }
    };

    let null_response_convention = if communication_working {
        facade::probe_null_response_convention(handle.transport_mut(), ctx).unwrap_or(false)
    } else {
        false
    };

    let mccs_version = if communication_working {
        facade::get_value(&mut handle, ctx, MCCS_VERSION_FEATURE, VcpValueKind::Simple)
            .ok()
            .and_then(|v| v.maximum())
            .map(u16::to_be_bytes)
    } else {
        None
    };

    drop(handle);

    reference.set_communication_checked(communication_working);
    if communication_working {
        reference.set_null_response_convention(null_response_convention);
        if let Some([major, minor]) = mccs_version {
            reference.set_mccs_version(major, minor);
        }
        reference.set_is_monitor(true);
    }
}
