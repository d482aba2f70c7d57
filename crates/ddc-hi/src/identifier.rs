//! A tagged description of *which* display a caller means (spec.md §3,
//! "Display Identifier"). Created by clients, consumed by
//! [`crate::registry::Registry::lookup`]; immutable after creation.

/// How a caller names a display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayIdentifier {
    /// The number the registry assigned during detection.
    DisplayNumber(u32),
    /// The I2C bus number (the `N` in `/dev/i2c-N`).
    I2cBus(u32),
    /// A vendor-adapter index / display-on-that-adapter index pair.
    AdapterIndex { adapter: u32, display: u32 },
    /// Any subset of manufacturer, model, and serial, matched against the
    /// EDID identity fields. At least one field should be set, though this
    /// is not enforced here -- an identifier matching nothing is simply an
    /// identifier that never matches a reference.
    ManufacturerModelSerial {
        manufacturer: Option<String>,
        model: Option<String>,
        serial: Option<String>,
    },
    /// The full 128-byte EDID block.
    Edid(Box<[u8; 128]>),
    /// USB (bus, device) address.
    Usb { bus: u8, device: u8 },
    /// A HID device's enumeration index.
    HidDeviceNumber(u32),
}

impl DisplayIdentifier {
    /// Does this identifier carry enough direct transport coordinates to
    /// synthesize a transient reference under `--force` (spec.md §4.6)?
    ///
    /// spec.md §4.6 names exactly "bus number, adapter/display index pair"
    /// for this -- not the USB form. That line item isn't an oversight: a
    /// HID monitor is opened by vendor/product/serial identity (see
    /// [`crate::reference::TransportCoordinates::Usb`]), so a bare bus/device
    /// pair alone isn't enough to synthesize an openable reference the way
    /// an I2C bus number or adapter index is. Manufacturer/model/serial and
    /// EDID identifiers describe a display by its identity, not by how to
    /// reach it, so they cannot be forced either.
    pub fn has_direct_coordinates(&self) -> bool {
        matches!(
            self,
            DisplayIdentifier::I2cBus(_) | DisplayIdentifier::AdapterIndex { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_coordinates_classification() {
        assert!(DisplayIdentifier::I2cBus(4).has_direct_coordinates());
        assert!(DisplayIdentifier::AdapterIndex { adapter: 0, display: 1 }.has_direct_coordinates());
        assert!(!DisplayIdentifier::Usb { bus: 1, device: 2 }.has_direct_coordinates());
        assert!(!DisplayIdentifier::DisplayNumber(1).has_direct_coordinates());
        assert!(!DisplayIdentifier::ManufacturerModelSerial {
            manufacturer: Some("ACME".into()),
            model: None,
            serial: None,
        }
        .has_direct_coordinates());
    }
}
