//! Plug-in facade: the minimal surface the host audio server's property
//! dispatch would bind against. Property-table boilerplate, object-id
//! routing, and device enumeration are an external collaborator's job and
//! are not reproduced here — only the stable identifiers and the hooks
//! that drive the core (§4.7).
//!
//! Shaped after the teacher's per-platform adapter: one struct per device,
//! named constants for the identifiers a host would look devices up by,
//! plain `Result`-returning methods instead of a full host-ABI vtable.

use std::sync::Arc;

use crate::clock::{SampleClock, TimeStamp};
use crate::error::DriverError;
use crate::ring::FrameRing;
use crate::volume::VolumeControl;

pub const OUTPUT_DEVICE_UID: &str = "auracard.output";
pub const INPUT_DEVICE_UID: &str = "auracard.input";
pub const OUTPUT_STREAM_UID: &str = "auracard.output.stream";
pub const INPUT_STREAM_UID: &str = "auracard.input.stream";
pub const OUTPUT_VOLUME_UID: &str = "auracard.output.volume";
pub const INPUT_VOLUME_UID: &str = "auracard.input.volume";

/// The IO operation the host requests for one realtime cycle. The facade
/// declines everything else (§4.3's "will-do" declaration).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOperation {
    WriteMix,
    ReadInput,
}

/// One virtual device's realtime-facing state: its ring, its clock, and
/// its volume control. The facade owns one of these per device and routes
/// host calls into it; it never hands the ring or clock out directly.
pub struct DeviceEndpoint {
    ring: Arc<FrameRing>,
    clock: SampleClock,
    volume: Arc<VolumeControl>,
    direction: IoOperation,
}

impl DeviceEndpoint {
    pub fn new(
        direction: IoOperation,
        capacity_frames: usize,
        channels: usize,
        sample_rate: u32,
        period_frames: u32,
        initial_volume: f32,
    ) -> Self {
        Self {
            ring: Arc::new(FrameRing::new(capacity_frames, channels)),
            clock: SampleClock::new(sample_rate, period_frames),
            volume: Arc::new(VolumeControl::new(initial_volume)),
            direction,
        }
    }

    pub fn start_io(&self) {
        self.clock.start_io();
    }

    pub fn stop_io(&self) {
        self.clock.stop_io();
    }

    pub fn zero_timestamp(&self) -> TimeStamp {
        self.clock.zero_timestamp()
    }

    /// Drive one realtime IO cycle. `buffer` is the host-owned interleaved
    /// float buffer for `ioSize` frames. Declines any operation other than
    /// the one this endpoint was built for.
    pub fn do_io(&self, op: IoOperation, buffer: &mut [f32]) -> Result<(), DriverError> {
        if op != self.direction {
            return Err(DriverError::Unsupported("IO operation not offered by this device"));
        }
        match op {
            IoOperation::WriteMix => {
                self.ring.write(buffer);
            }
            IoOperation::ReadInput => {
                self.ring.read_or_silence(buffer);
            }
        }
        Ok(())
    }

    pub fn get_volume_scalar(&self) -> f32 {
        self.volume.get_scalar()
    }

    pub fn set_volume_scalar(&self, scalar: f32) {
        self.volume.set_scalar(scalar);
    }

    pub fn get_volume_db(&self) -> f32 {
        self.volume.get_db()
    }

    pub fn set_volume_db(&self, db: f32) {
        self.volume.set_db(db);
    }

    pub fn ring(&self) -> &FrameRing {
        &self.ring
    }

    pub fn ring_handle(&self) -> Arc<FrameRing> {
        Arc::clone(&self.ring)
    }

    pub fn volume(&self) -> &VolumeControl {
        &self.volume
    }

    pub fn volume_handle(&self) -> Arc<VolumeControl> {
        Arc::clone(&self.volume)
    }
}
