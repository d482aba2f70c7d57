//! The USB HID transport (USB Monitor Control Class, spec.md §4.1, §9).
//!
//! USB HID monitors carry the same DDC/CI frame bytes as an I2C exchange,
//! wrapped in a vendor-defined HID feature report rather than addressed on
//! an I2C bus. When the `hidapi` feature is disabled (or no backend is
//! available at runtime) this degrades to the same always-unavailable stub
//! shape as `ddc-adapter`, so callers never need to distinguish "not
//! compiled in" from "no device found".

use ddc_core::transport::{Transport, TransportError, TransportKind};

/// The HID feature report ID DDC/CI frames are wrapped in.
const DDC_HID_REPORT_ID: u8 = 0xf1;

#[cfg(feature = "hidapi")]
mod backend {
    use super::*;
    use hidapi::{HidApi, HidDevice};

    /// A DDC/CI transport over a USB HID monitor-control interface.
    pub struct HidTransport {
        device: HidDevice,
        reply: Vec<u8>,
    }

    impl HidTransport {
        /// Open the HID device at `vendor_id`/`product_id` (and, when more
        /// than one interface matches, `serial_number`).
        pub fn open(vendor_id: u16, product_id: u16, serial_number: Option<&str>) -> Result<Self, TransportError> {
            let api = HidApi::new().map_err(map_hid_error)?;
            let device = match serial_number {
                Some(serial) => api.open_serial(vendor_id, product_id, serial),
                None => api.open(vendor_id, product_id),
            }
            .map_err(map_hid_error)?;
            Ok(HidTransport {
                device,
                reply: Vec::new(),
            })
        }
    }

    impl Transport for HidTransport {
        fn kind(&self) -> TransportKind {
            TransportKind::Usb
        }

        fn write(&mut self, frame: &[u8]) -> Result<(), TransportError> {
            let mut report = Vec::with_capacity(frame.len() + 1);
            report.push(DDC_HID_REPORT_ID);
            report.extend_from_slice(frame);
            self.device.send_feature_report(&report).map_err(map_hid_error)?;
            self.reply.clear();
            self.reply.resize(frame.len().max(36) + 1, 0);
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
            self.reply[0] = DDC_HID_REPORT_ID;
            let n = self.device.get_feature_report(&mut self.reply).map_err(map_hid_error)?;
            let payload = &self.reply[1..n];
            let len = payload.len().min(buf.len());
            buf[..len].copy_from_slice(&payload[..len]);
            Ok(len)
        }
    }

    fn map_hid_error(err: hidapi::HidError) -> TransportError {
        match err {
            hidapi::HidError::HidApiErrorEmpty | hidapi::HidError::OpenHidDeviceError => TransportError::NoDevice,
            other => TransportError::Other(other.to_string()),
        }
    }

    /// Enumerate attached USB HID monitor-control devices.
    pub fn enumerate() -> Vec<(u16, u16, Option<String>)> {
        match HidApi::new() {
            Ok(api) => api
                .device_list()
                .map(|info| (info.vendor_id(), info.product_id(), info.serial_number().map(str::to_owned)))
                .collect(),
            Err(err) => {
                log::warn!("ddc-hid: failed to enumerate HID devices: {err}");
                Vec::new()
            }
        }
    }
}

#[cfg(not(feature = "hidapi"))]
mod backend {
    use super::*;

    /// Always-unavailable stand-in for [`HidTransport`] when the `hidapi`
    /// backend is not compiled in.
    pub struct HidTransport {
        _private: (),
    }

    impl HidTransport {
        pub fn open(_vendor_id: u16, _product_id: u16, _serial_number: Option<&str>) -> Result<Self, TransportError> {
            Err(TransportError::Unavailable)
        }
    }

    impl Transport for HidTransport {
        fn kind(&self) -> TransportKind {
            TransportKind::Usb
        }

        fn write(&mut self, _frame: &[u8]) -> Result<(), TransportError> {
            Err(TransportError::Unavailable)
        }

        fn read(&mut self, _buf: &mut [u8]) -> Result<usize, TransportError> {
            Err(TransportError::Unavailable)
        }
    }

    pub fn enumerate() -> Vec<(u16, u16, Option<String>)> {
        log::debug!("ddc-hid: hidapi backend not compiled in, reporting zero displays");
        Vec::new()
    }
}

pub use backend::{enumerate, HidTransport};

#[cfg(all(test, not(feature = "hidapi")))]
mod tests {
    use super::*;

    #[test]
    fn stub_backend_reports_unavailable() {
        assert!(HidTransport::open(0, 0, None).is_err());
        assert!(enumerate().is_empty());
    }
}
