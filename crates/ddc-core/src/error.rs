//! The flat, closed error-kind taxonomy of spec.md §7.

use thiserror::Error;

/// Protocol-level and semantic outcomes of a DDC/CI exchange.
///
/// This is deliberately flat (not nested per-transport) so the retry
/// controller and facade can match on it uniformly; only the transport
/// crates know the OS-level detail behind [`ErrorKind::Transport`].
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    /// Bad checksum, bad length byte, wrong opcode, or a mismatched echoed
    /// subtype -- any framing-level corruption.
    #[error("DDC/CI framing error (bad checksum, length, or opcode)")]
    DdcData,
    /// The monitor replied with the 4-byte DDC Null Message.
    #[error("DDC/CI null response")]
    NullResponse,
    /// The reply was all-zero bytes.
    #[error("DDC/CI read returned all-zero bytes")]
    ReadAllZero,
    /// The reply was byte-for-byte identical to the request just written.
    #[error("DDC/CI read echoed the write")]
    ReadEqualsWrite,
    /// A multi-part fragment echoed an offset other than the one requested.
    #[error("DDC/CI multi-part fragment had an unexpected offset")]
    MultiPartReadFragment,
    /// EDID checksum or header validation failed.
    #[error("invalid EDID data")]
    InvalidEdid,
    /// The monitor explicitly reported the feature as unsupported.
    #[error("feature not supported by monitor")]
    ReportedUnsupported,
    /// Unsupported was inferred (all-tries-zero, or the null-response
    /// convention for this display).
    #[error("feature not supported by monitor (inferred)")]
    DeterminedUnsupported,
    /// The bounded retry loop was exhausted by a retryable error.
    #[error("DDC communication failed, retries exhausted")]
    Retries,
    /// Retries were exhausted and every attempt was `ReadAllZero`.
    #[error("DDC communication failed, retries exhausted (monitor not responding)")]
    AllTriesZero,
    /// A `set_value` with verification enabled read back a different value.
    #[error("verification read-back did not match the value written")]
    Verify,
    /// An underlying transport/OS error, tagged with the originating class.
    #[error("transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),
    /// Caller passed something the library cannot act on.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A handle or context was used before being initialized.
    #[error("uninitialized")]
    Uninitialized,
    /// The referenced VCP feature code is not recognized.
    #[error("unknown feature code 0x{0:02x}")]
    UnknownFeature(u8),
    /// The referenced display could not be resolved from its identifier.
    #[error("invalid or unknown display")]
    InvalidDisplay,
}

impl ErrorKind {
    /// True for the handful of outcomes that the retry controller is
    /// allowed to fold transient framing errors into -- i.e. this should
    /// never itself be passed to [`crate::retry::with_retry`] as the "raw"
    /// per-attempt error; it is the *result* of that collapsing.
    pub fn is_retry_collapse(&self) -> bool {
        matches!(self, ErrorKind::Retries | ErrorKind::AllTriesZero)
    }

    /// User-visible, short description per spec.md §7 ("User-visible failure").
    pub fn user_message(&self, feature: Option<u8>) -> String {
        match self {
            ErrorKind::ReportedUnsupported | ErrorKind::DeterminedUnsupported => match feature {
                Some(f) => format!("feature 0x{f:02x} not supported by monitor"),
                None => "feature not supported by monitor".into(),
            },
            ErrorKind::Retries | ErrorKind::AllTriesZero => {
                "DDC communication failed, retries exhausted".into()
            }
            ErrorKind::Transport(t) => t.to_string(),
            other => other.to_string(),
        }
    }
}
