//! The registry's canonical record for a detected display (spec.md §3,
//! "Display Reference").

use std::cell::RefCell;

use bitflags::bitflags;
use ddc_core::transport::TransportKind;

use crate::edid::EdidIdentity;

bitflags! {
    /// Progress of a reference's initial checks (spec.md §4.6).
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct ReferenceFlags: u8 {
        /// The communication check has run (pass or fail).
        const DDC_CHECKED = 0b0000_0001;
        /// The communication check passed.
        const DDC_WORKING = 0b0000_0010;
        /// The null-response convention probe has run.
        const NULL_RESPONSE_CHECKED = 0b0000_0100;
        /// Feature 0x00 reads come back as the DDC Null Message on this
        /// display, rather than the standard "unsupported" reply.
        const USES_NULL_RESPONSE_FOR_UNSUPPORTED = 0b0000_1000;
        /// The detected endpoint is believed to be an actual monitor (as
        /// opposed to, e.g., a powered-off or loopback I2C bus).
        const IS_MONITOR = 0b0001_0000;
    }
}

/// Which transport a reference is reached through, and the coordinates
/// needed to open it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportCoordinates {
    I2c { bus: u32, path: std::path::PathBuf },
    Adapter { adapter: u32, display: u32 },
    /// `bus`/`device` are the USB topology address used by the
    /// `--usb B.D` selector (spec.md §6); `vendor_id`/`product_id`/
    /// `serial_number` are what `ddc-hid` actually opens by, since hidapi
    /// addresses devices by descriptor identity rather than bus position.
    Usb {
        bus: u8,
        device: u8,
        vendor_id: u16,
        product_id: u16,
        serial_number: Option<String>,
    },
}

impl TransportCoordinates {
    pub fn kind(&self) -> TransportKind {
        match self {
            TransportCoordinates::I2c { .. } => TransportKind::I2c,
            TransportCoordinates::Adapter { .. } => TransportKind::Adapter,
            TransportCoordinates::Usb { .. } => TransportKind::Usb,
        }
    }
}

/// The MCCS protocol version negotiated with a display, or that it hasn't
/// been queried yet.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MccsVersion {
    Unqueried,
    Known { major: u8, minor: u8 },
}

/// A detected display, as recorded by the registry.
///
/// Owned by the registry for the process lifetime; handed to callers only
/// as a borrow (spec.md §3: "references handed to callers are borrows that
/// must not be freed").
#[derive(Clone, Debug)]
pub struct DisplayReference {
    coordinates: TransportCoordinates,
    edid: Option<EdidIdentity>,
    dispno: i32,
    mccs_version: MccsVersion,
    flags: ReferenceFlags,
    /// Populated lazily by the first successful `get_capabilities` call.
    /// `RefCell` rather than `&mut` because the reference is only ever
    /// handed out as a shared borrow once detection finishes (spec.md §3).
    capabilities_cache: RefCell<Option<Vec<u8>>>,
}

impl DisplayReference {
    /// Construct a freshly-enumerated, not-yet-checked reference. `dispno`
    /// starts at `-1` ("detected but DDC not working") until
    /// [`DisplayReference::set_working`] promotes it.
    pub fn new(coordinates: TransportCoordinates, edid: Option<EdidIdentity>) -> Self {
        DisplayReference {
            coordinates,
            edid,
            dispno: -1,
            mccs_version: MccsVersion::Unqueried,
            flags: ReferenceFlags::empty(),
            capabilities_cache: RefCell::new(None),
        }
    }

    pub fn coordinates(&self) -> &TransportCoordinates {
        &self.coordinates
    }

    pub fn edid(&self) -> Option<&EdidIdentity> {
        self.edid.as_ref()
    }

    pub fn dispno(&self) -> i32 {
        self.dispno
    }

    pub fn mccs_version(&self) -> MccsVersion {
        self.mccs_version
    }

    pub fn flags(&self) -> ReferenceFlags {
        self.flags
    }

    pub fn capabilities_cache(&self) -> Option<Vec<u8>> {
        self.capabilities_cache.borrow().clone()
    }

    /// Populate the capabilities cache. Takes `&self` since the reference
    /// is shared once handed out; see the field doc comment.
    pub fn cache_capabilities(&self, bytes: Vec<u8>) {
        *self.capabilities_cache.borrow_mut() = Some(bytes);
    }

    /// Record the outcome of the communication check.
    ///
    /// Enforces `DDC_WORKING ⇒ DDC_CHECKED` (spec.md §3) by always setting
    /// `DDC_CHECKED`, regardless of the outcome.
    pub fn set_communication_checked(&mut self, working: bool) {
        self.flags.insert(ReferenceFlags::DDC_CHECKED);
        self.flags.set(ReferenceFlags::DDC_WORKING, working);
        if !working {
            // A display number can only survive a failed check if it was
            // never assigned; assigning happens strictly after this call.
            debug_assert!(self.dispno < 0);
        }
    }

    pub fn set_null_response_convention(&mut self, uses_null_response: bool) {
        self.flags.insert(ReferenceFlags::NULL_RESPONSE_CHECKED);
        self.flags.set(ReferenceFlags::USES_NULL_RESPONSE_FOR_UNSUPPORTED, uses_null_response);
    }

    pub fn set_mccs_version(&mut self, major: u8, minor: u8) {
        self.mccs_version = MccsVersion::Known { major, minor };
    }

    pub fn set_is_monitor(&mut self, is_monitor: bool) {
        self.flags.set(ReferenceFlags::IS_MONITOR, is_monitor);
    }

    /// Assign a positive display number. Panics in debug builds if
    /// `DDC_WORKING` is not set, enforcing spec.md §3's second invariant
    /// (`dispno > 0 ⇒ DDC_WORKING`).
    pub fn assign_dispno(&mut self, dispno: u32) {
        debug_assert!(self.flags.contains(ReferenceFlags::DDC_WORKING));
        self.dispno = dispno as i32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords() -> TransportCoordinates {
        TransportCoordinates::I2c { bus: 4, path: "/dev/i2c-4".into() }
    }

    #[test]
    fn fresh_reference_is_unassigned() {
        let reference = DisplayReference::new(coords(), None);
        assert_eq!(reference.dispno(), -1);
        assert_eq!(reference.mccs_version(), MccsVersion::Unqueried);
        assert!(reference.flags().is_empty());
    }

    #[test]
    fn communication_check_sets_both_flags_on_success() {
        let mut reference = DisplayReference::new(coords(), None);
        reference.set_communication_checked(true);
        assert!(reference.flags().contains(ReferenceFlags::DDC_CHECKED));
        assert!(reference.flags().contains(ReferenceFlags::DDC_WORKING));
    }

    #[test]
    fn communication_check_sets_checked_without_working_on_failure() {
        let mut reference = DisplayReference::new(coords(), None);
        reference.set_communication_checked(false);
        assert!(reference.flags().contains(ReferenceFlags::DDC_CHECKED));
        assert!(!reference.flags().contains(ReferenceFlags::DDC_WORKING));
    }

    #[test]
    fn assign_dispno_requires_working() {
        let mut reference = DisplayReference::new(coords(), None);
        reference.set_communication_checked(true);
        reference.assign_dispno(1);
        assert_eq!(reference.dispno(), 1);
    }
}
