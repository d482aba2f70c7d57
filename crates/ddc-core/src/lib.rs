//! DDC/CI protocol engine: packet framing, the write-read/write-only
//! exchange primitives, the bounded retry controller, and the multi-part
//! reader used for capabilities and table reads.
//!
//! This crate knows nothing about how bytes actually reach a monitor --
//! that is [`transport::Transport`], implemented once per transport crate
//! (`ddc-i2c`, `ddc-adapter`, `ddc-hid`). It also knows nothing about
//! display enumeration or identification; that lives in `ddc-hi`.

pub mod context;
pub mod error;
pub mod exchange;
pub mod multipart;
pub mod packet;
pub mod retry;
pub mod sleep;
pub mod transport;
pub mod vcp;

pub use context::{Context, IoStrategy};
pub use error::ErrorKind;
pub use multipart::{read_multi, MultiPartLimits};
pub use packet::{FeatureCode, Opcode, RequestFrame, ResponsePacket};
pub use retry::{with_retry, RetryClass, RetryMaxima, RetryStats};
pub use sleep::{SleepPhase, SleepStats, SleepTable};
pub use transport::{Transport, TransportError, TransportKind};
pub use vcp::VcpValue;
