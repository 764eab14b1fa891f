//! # auracard
//!
//! A virtual audio driver core: two virtual audio endpoints (Output,
//! Input) bridging realtime audio to a remote peer over a byte-stream
//! transport, compressed with Opus.
//!
//! ## Architecture
//!
//! The interesting engineering lives in three places:
//!
//! - [`ring`]: the lock-free SPSC frame queue between the realtime IO
//!   handler and the transport workers.
//! - [`clock`]: the monotonic sample clock the host uses to schedule IO
//!   cycles.
//! - [`transport`] and [`codec`]: the worker tasks and the codec/framing
//!   shim that bridge the rings to the peer.
//!
//! [`facade`] and [`driver`] tie these into the two virtual devices a host
//! audio server would bind against; [`config`] and [`error`] are the
//! ambient stack every module above builds on.

/// Lock-free single-producer/single-consumer frame ring.
pub mod ring;

/// Monotonic sample clock for realtime IO scheduling.
pub mod clock;

/// Atomic gain/mute control with linear/dB conversion.
pub mod volume;

/// Opus codec integration and wire-frame framing.
pub mod codec;

/// Egress/ingress transport worker tasks.
pub mod transport;

/// Plug-in facade: stable device/stream/control identifiers and IO hooks.
pub mod facade;

/// Process-wide driver state lifecycle.
pub mod driver;

/// Configuration loading with load-or-create-default semantics.
pub mod config;

/// Error taxonomy for the non-realtime paths.
pub mod error;

pub use config::{ConfigManager, DriverConfig};
pub use driver::DriverState;
pub use error::DriverError;
pub use facade::{DeviceEndpoint, IoOperation};

/// Initialize the `env_logger` backend for the `log` facade used
/// throughout this crate. The host process calls this once at plug-in
/// load, before constructing a [`DriverState`]; safe to call more than
/// once, later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::try_init();
}
