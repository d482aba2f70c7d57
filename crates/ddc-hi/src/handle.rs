//! A handle to an opened transport endpoint bound to one reference
//! (spec.md §3, "Display Handle").

use ddc_core::context::Context;
use ddc_core::error::ErrorKind;
use ddc_core::transport::{Transport, TransportKind};
use ddc_core::vcp::VcpValue;

use crate::facade::{self, VcpValueKind};
use crate::reference::DisplayReference;

/// An open transport bound to a [`DisplayReference`].
///
/// Exclusively owned by whichever caller opened it (closing -- via `Drop`
/// on the boxed transport -- releases the descriptor but leaves the
/// reference, and its cached EDID/version/flags, intact). Concurrent calls
/// on the same handle are the caller's responsibility to serialize
/// (spec.md §5).
pub struct DisplayHandle<'reg> {
    transport: Box<dyn Transport + Send>,
    reference: &'reg DisplayReference,
}

impl<'reg> DisplayHandle<'reg> {
    pub(crate) fn new(transport: Box<dyn Transport + Send>, reference: &'reg DisplayReference) -> Self {
        DisplayHandle { transport, reference }
    }

    pub fn reference(&self) -> &DisplayReference {
        self.reference
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    pub(crate) fn transport_mut(&mut self) -> &mut (dyn Transport + Send) {
        &mut *self.transport
    }

    /// Read a VCP feature through [`facade::get_value`]. A thin convenience
    /// wrapper so callers (chiefly `ddcset`) don't need to import the facade
    /// module separately from the handle they're calling it on.
    pub fn get_value(&mut self, ctx: &Context, feature: u8, kind: VcpValueKind) -> Result<VcpValue, ErrorKind> {
        facade::get_value(self, ctx, feature, kind)
    }

    /// Write a VCP feature through [`facade::set_value`].
    pub fn set_value(&mut self, ctx: &Context, feature: u8, value: &VcpValue, verify: bool) -> Result<(), ErrorKind> {
        facade::set_value(self, ctx, feature, value, verify)
    }

    /// Retrieve (and cache) the capability string through [`facade::get_capabilities`].
    pub fn get_capabilities(&mut self, ctx: &Context) -> Result<Vec<u8>, ErrorKind> {
        facade::get_capabilities(self, ctx)
    }
}
