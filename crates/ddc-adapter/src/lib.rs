//! The vendor GPU adapter transport (spec.md §4.1, §9).
//!
//! No vendor adapter API (NVAPI, ADL, or similar) is linked into this
//! workspace, so enumeration always reports zero adapter displays and every
//! operation fails with [`TransportError::Unavailable`]. The type exists so
//! `ddc-hi`'s registry and retry-policy code can treat "adapter transport"
//! as a real, always-absent option rather than special-casing its absence.

use ddc_core::transport::{Transport, TransportError, TransportKind};

/// A handle to a vendor-adapter-exposed display. Never successfully
/// constructed by [`enumerate`]; kept so downstream code has a concrete
/// type to name.
pub struct AdapterTransport {
    _private: (),
}

impl AdapterTransport {
    /// Open the display at `display` on adapter `adapter`. Always fails:
    /// see the module documentation.
    pub fn open(_adapter: u32, _display: u32) -> Result<Self, TransportError> {
        Err(TransportError::Unavailable)
    }
}

impl Transport for AdapterTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Adapter
    }

    fn write(&mut self, _frame: &[u8]) -> Result<(), TransportError> {
        Err(TransportError::Unavailable)
    }

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, TransportError> {
        Err(TransportError::Unavailable)
    }
}

/// Enumerate vendor-adapter-exposed displays as `(adapter, display)` index
/// pairs. Always empty: see the module documentation.
pub fn enumerate() -> Vec<(u32, u32)> {
    log::debug!("ddc-adapter: no vendor adapter backend compiled in, reporting zero displays");
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerate_is_always_empty() {
        assert!(enumerate().is_empty());
    }

    #[test]
    fn open_always_unavailable() {
        assert!(matches!(AdapterTransport::open(0, 0), Err(TransportError::Unavailable)));
    }
}
