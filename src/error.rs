//! A small error taxonomy for the non-realtime paths.
//!
//! The realtime IO handler never reports errors upward (§7): overflow and
//! underflow collapse to silence at the ring boundary. Everywhere else,
//! fallible entry points return `anyhow::Result` with `.context(...)` added
//! at module boundaries, and init-time failures that the facade must
//! surface to the host are narrowed to this enum rather than left as
//! opaque `anyhow::Error`.

use std::fmt;

/// Fatal-vs-recoverable classification for errors that cross the
/// facade boundary. This is deliberately narrow: it names only the
/// distinctions the facade's init path and property dispatch need, not a
/// general-purpose recovery/retry taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Codec or socket construction failed during driver-state init.
    /// Fatal: there is no retry path, the plug-in load itself fails.
    InitFailed(String),
    /// A property/control request from the host carried a buffer of the
    /// wrong size. Recoverable: return "bad size" to the host, never abort.
    InvalidPropertySize { expected: usize, got: usize },
    /// The host asked for an IO operation or property this driver doesn't
    /// implement. Recoverable: return "unsupported".
    Unsupported(&'static str),
    /// A wire frame declared a length outside `1..=max_packet_bytes`.
    /// Treated as a transport error: the worker reconnects.
    InvalidFrameLength(u16),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::InitFailed(reason) => write!(f, "driver init failed: {reason}"),
            DriverError::InvalidPropertySize { expected, got } => write!(
                f,
                "invalid property size: expected {expected}, got {got}"
            ),
            DriverError::Unsupported(what) => write!(f, "unsupported operation: {what}"),
            DriverError::InvalidFrameLength(len) => {
                write!(f, "invalid wire frame length: {len}")
            }
        }
    }
}

impl std::error::Error for DriverError {}
