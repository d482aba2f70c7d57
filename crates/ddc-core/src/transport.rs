//! The transport-abstraction layer (spec.md §4.1): a small capability
//! interface implemented once per transport (`ddc-i2c`, `ddc-adapter`,
//! `ddc-hid`), dispatched per-open so the handle just carries the choice.

use thiserror::Error;

/// Which of the three supported transports a display is reached through.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TransportKind {
    /// `/dev/i2c-N`, DDC/CI over the I2C sideband.
    I2c,
    /// A vendor GPU adapter API that performs the I2C exchange internally.
    Adapter,
    /// USB HID, the USB Monitor Control Class.
    Usb,
}

/// OS/transport-level errors, surfaced verbatim rather than collapsed by
/// the retry controller (spec.md §7, "Transport/OS errors").
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum TransportError {
    /// The device or bus reported busy (I2C `EIO`-class condition).
    #[error("device or bus busy")]
    Busy,
    /// The file descriptor or handle was invalid (`EBADF`-class condition).
    #[error("bad descriptor")]
    BadDescriptor,
    /// The caller lacks permission to open or operate on the device.
    #[error("permission denied")]
    PermissionDenied,
    /// No such device node, or it has been unplugged.
    #[error("no such device")]
    NoDevice,
    /// The backing library/feature for this transport was not compiled in
    /// or is not available at runtime (spec.md §4.1, §9: vendor-adapter and
    /// HID stubs).
    #[error("transport unavailable")]
    Unavailable,
    /// Any other OS error, with its raw description preserved.
    #[error("{0}")]
    Other(String),
}

/// The contract every transport exposes to the exchange engine.
///
/// `open`/`close` are intentionally not part of this trait: each transport
/// crate exposes its own `open(coordinates) -> Result<Self, TransportError>`
/// constructor (coordinates differ per transport) and releases the
/// descriptor in `Drop`, matching the Display Handle ownership model of
/// spec.md §3.
pub trait Transport {
    /// Which transport this is, for retry-policy and sleep-table lookups.
    fn kind(&self) -> TransportKind;

    /// Write a complete DDC/CI frame (including the leading `0x51`
    /// sub-address byte). The true hardware address, where one exists, is
    /// out of band (set once per open, e.g. via `ioctl` on I2C).
    fn write(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Read up to `buf.len()` bytes of a monitor reply into `buf`, returning
    /// the number of bytes actually read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;
}
