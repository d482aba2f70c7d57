//! DDC/CI over `/dev/i2c-N`: the [`ddc_core::Transport`] implementation,
//! EDID/E-DDC reads, and (behind the `udev` feature) device-node discovery.

mod edid;
mod transport;

#[cfg(feature = "udev")]
mod enumerate;

pub use transport::I2cTransport;

#[cfg(feature = "udev")]
pub use enumerate::Enumerator;
