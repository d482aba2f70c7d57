//! The high-level DDC/CI facade: display identifiers, the display registry,
//! display handles, and the unified VCP value facade (spec.md §4.6-§4.7).
//!
//! `ddc-core` knows how to frame and exchange DDC/CI packets but nothing
//! about *which* display a caller means or how to find one; that's this
//! crate. A typical caller:
//!
//! ```rust,no_run
//! use ddc_core::context::Context;
//! use ddc_hi::facade::VcpValueKind;
//! use ddc_hi::{DisplayIdentifier, Registry};
//!
//! let ctx = Context::new();
//! let registry = Registry::detect(&ctx);
//! let reference = registry.lookup(&DisplayIdentifier::DisplayNumber(1)).unwrap();
//! let mut handle = registry.open(reference, &ctx).unwrap();
//! let brightness = handle.get_value(&ctx, 0x10, VcpValueKind::Simple).unwrap();
//! println!("{brightness:?}");
//! ```

pub mod config;
pub mod edid;
pub mod facade;
pub mod handle;
pub mod identifier;
pub mod reference;
pub mod registry;

pub use config::Settings;
pub use edid::EdidIdentity;
pub use facade::VcpValueKind;
pub use handle::DisplayHandle;
pub use identifier::DisplayIdentifier;
pub use reference::{DisplayReference, MccsVersion, ReferenceFlags, TransportCoordinates};
pub use registry::{open_display, Registry};

pub use ddc_core::context::Context;
pub use ddc_core::error::ErrorKind;
pub use ddc_core::vcp::VcpValue;
